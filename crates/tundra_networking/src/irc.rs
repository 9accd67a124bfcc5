//! IRC line parsing for a chat bridge.
//!
//! Only the protocol side lives here: splitting raw lines into messages,
//! classifying them, and the registration handshake. Relaying between IRC
//! and game chat is left to the bridge.

use std::sync::OnceLock;

use regex::Regex;

/// Reply code sent once the server accepts the registration.
pub const RPL_WELCOME: &str = "001";
/// Reply code for a nickname already taken.
pub const ERR_NICKNAMEINUSE: &str = "433";

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?::(?P<prefix>\S+)\s+)?(?P<command>[A-Za-z]+|\d{3})(?P<params>(?:\s+[^:\s]\S*)*)(?:\s+:(?P<trailing>.*))?$")
            .unwrap_or_else(|err| unreachable!("static pattern: {err}"))
    })
}

/// Source of a message, `nick!user@host` or a server name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Prefix {
    /// Nickname or server name.
    pub nick: String,
    /// Username, if present.
    pub user: Option<String>,
    /// Host, if present.
    pub host: Option<String>,
}

impl Prefix {
    fn parse(raw: &str) -> Self {
        let (rest, host) = match raw.split_once('@') {
            Some((rest, host)) => (rest, Some(host.to_owned())),
            None => (raw, None),
        };
        let (nick, user) = match rest.split_once('!') {
            Some((nick, user)) => (nick, Some(user.to_owned())),
            None => (rest, None),
        };
        Self { nick: nick.to_owned(), user, host }
    }
}

/// One parsed IRC line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrcMessage {
    /// Sender.
    pub prefix: Option<Prefix>,
    /// Command or three-digit reply code, upper-cased.
    pub command: String,
    /// Middle parameters.
    pub params: Vec<String>,
    /// Parameter after ` :`, which may contain spaces.
    pub trailing: Option<String>,
}

/// What a line means to a bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrcEvent {
    /// Server keepalive; answer with the token.
    Ping {
        /// Token to echo.
        token: String,
    },
    /// Registration accepted.
    Welcome,
    /// Message to the bot itself.
    PrivateMessage {
        /// Sender nick.
        from: String,
        /// Text.
        text: String,
    },
    /// Message to a channel.
    ChannelMessage {
        /// Sender nick.
        from: String,
        /// Channel.
        channel: String,
        /// Text.
        text: String,
    },
    /// CTCP ACTION (`/me`).
    Action {
        /// Sender nick.
        from: String,
        /// Channel or nick it was sent to.
        target: String,
        /// Text without the CTCP wrapper.
        text: String,
    },
    /// Someone joined a channel.
    Join {
        /// Nick.
        nick: String,
        /// Channel.
        channel: String,
    },
    /// Someone left a channel.
    Part {
        /// Nick.
        nick: String,
        /// Channel.
        channel: String,
    },
    /// Someone disconnected.
    Quit {
        /// Nick.
        nick: String,
        /// Quit message.
        reason: String,
    },
    /// Someone was kicked.
    Kick {
        /// Kicked nick.
        nick: String,
        /// Channel.
        channel: String,
        /// Kicker.
        by: String,
        /// Reason.
        reason: String,
    },
    /// Nick change.
    Nick {
        /// Old nick.
        from: String,
        /// New nick.
        to: String,
    },
    /// Our nick is taken.
    NicknameInUse,
    /// Anything else.
    Other,
}

impl IrcMessage {
    /// Parses one line without its CR LF. Returns `None` for lines that
    /// are not IRC messages.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        let captures = line_pattern().captures(line)?;
        Some(Self {
            prefix: captures.name("prefix").map(|m| Prefix::parse(m.as_str())),
            command: captures.name("command")?.as_str().to_ascii_uppercase(),
            params: captures
                .name("params")
                .map(|m| m.as_str().split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default(),
            trailing: captures.name("trailing").map(|m| m.as_str().to_owned()),
        })
    }

    /// Parameter `index`, counting the trailing one last.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str).or_else(|| {
            if index == self.params.len() {
                self.trailing.as_deref()
            } else {
                None
            }
        })
    }

    fn nick(&self) -> String {
        self.prefix.as_ref().map(|p| p.nick.clone()).unwrap_or_default()
    }

    /// Classifies the message.
    #[must_use]
    pub fn classify(&self) -> IrcEvent {
        let text = || self.trailing.clone().unwrap_or_default();
        match self.command.as_str() {
            "PING" => IrcEvent::Ping { token: self.param(0).unwrap_or_default().to_owned() },
            RPL_WELCOME => IrcEvent::Welcome,
            ERR_NICKNAMEINUSE => IrcEvent::NicknameInUse,
            "PRIVMSG" => {
                let target = self.param(0).unwrap_or_default().to_owned();
                let body = text();
                if let Some(action) = body.strip_prefix("\u{1}ACTION ") {
                    return IrcEvent::Action { from: self.nick(), target, text: action.trim_end_matches('\u{1}').to_owned() };
                }
                if target.starts_with(&['#', '&'][..]) {
                    IrcEvent::ChannelMessage { from: self.nick(), channel: target, text: body }
                } else {
                    IrcEvent::PrivateMessage { from: self.nick(), text: body }
                }
            }
            "JOIN" => IrcEvent::Join { nick: self.nick(), channel: self.param(0).unwrap_or_default().to_owned() },
            "PART" => IrcEvent::Part { nick: self.nick(), channel: self.param(0).unwrap_or_default().to_owned() },
            "QUIT" => IrcEvent::Quit { nick: self.nick(), reason: text() },
            "KICK" => IrcEvent::Kick {
                nick: self.param(1).unwrap_or_default().to_owned(),
                channel: self.param(0).unwrap_or_default().to_owned(),
                by: self.nick(),
                reason: text(),
            },
            "NICK" => IrcEvent::Nick { from: self.nick(), to: self.param(0).unwrap_or_default().to_owned() },
            _ => IrcEvent::Other,
        }
    }
}

/// Registration progress of a bridge connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IrcState {
    /// NICK/USER sent, waiting for the welcome reply.
    #[default]
    Connecting,
    /// Registered, channels not joined yet.
    Registered,
    /// In at least one channel.
    Joined,
}

/// Drives registration and keepalive for one connection.
#[derive(Clone, Debug)]
pub struct IrcConnection {
    nick: String,
    channels: Vec<String>,
    state: IrcState,
    retries: u32,
}

impl IrcConnection {
    /// Creates a connection that will register as `nick` and join `channels`.
    #[must_use]
    pub fn new(nick: impl Into<String>, channels: Vec<String>) -> Self {
        Self { nick: nick.into(), channels, state: IrcState::Connecting, retries: 0 }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> IrcState {
        self.state
    }

    /// Nick in use.
    #[must_use]
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Lines to send right after connecting.
    #[must_use]
    pub fn register(&self) -> Vec<String> {
        vec![format!("NICK {}", self.nick), format!("USER {} 8 * :{}", self.nick, self.nick)]
    }

    /// Feeds one parsed message and returns the lines to send back.
    pub fn handle(&mut self, message: &IrcMessage) -> Vec<String> {
        match message.classify() {
            IrcEvent::Ping { token } => vec![format!("PONG :{token}")],
            IrcEvent::Welcome => {
                self.state = IrcState::Registered;
                self.channels.iter().map(|channel| format!("JOIN {channel}")).collect()
            }
            IrcEvent::NicknameInUse if self.state == IrcState::Connecting => {
                self.retries += 1;
                self.nick = format!("{}{}", self.nick.trim_end_matches(|c: char| c.is_ascii_digit()), self.retries);
                vec![format!("NICK {}", self.nick)]
            }
            IrcEvent::Join { nick, .. } if nick.eq_ignore_ascii_case(&self.nick) => {
                self.state = IrcState::Joined;
                Vec::new()
            }
            IrcEvent::Nick { from, to } if from.eq_ignore_ascii_case(&self.nick) => {
                self.nick = to;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> IrcMessage {
        IrcMessage::parse(line).unwrap()
    }

    #[test]
    fn test_parse_full_line() {
        let message = parse(":alice!al@example.org PRIVMSG #tundra :hello there\r\n");
        assert_eq!(
            message.prefix,
            Some(Prefix { nick: "alice".into(), user: Some("al".into()), host: Some("example.org".into()) })
        );
        assert_eq!(message.command, "PRIVMSG");
        assert_eq!(message.params, vec!["#tundra".to_owned()]);
        assert_eq!(message.trailing.as_deref(), Some("hello there"));
    }

    #[test]
    fn test_parse_without_prefix_or_trailing() {
        let message = parse("ping irc.example.org");
        assert_eq!(message.prefix, None);
        assert_eq!(message.command, "PING");
        assert_eq!(message.classify(), IrcEvent::Ping { token: "irc.example.org".into() });
        assert!(IrcMessage::parse("").is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(parse(":irc.example.org 001 bot :Welcome").classify(), IrcEvent::Welcome);
        assert_eq!(
            parse(":bob!b@h PRIVMSG bot :psst").classify(),
            IrcEvent::PrivateMessage { from: "bob".into(), text: "psst".into() }
        );
        assert_eq!(
            parse(":bob!b@h PRIVMSG #c :\u{1}ACTION waves\u{1}").classify(),
            IrcEvent::Action { from: "bob".into(), target: "#c".into(), text: "waves".into() }
        );
        assert_eq!(
            parse(":op!o@h KICK #c bob :spam").classify(),
            IrcEvent::Kick { nick: "bob".into(), channel: "#c".into(), by: "op".into(), reason: "spam".into() }
        );
        assert_eq!(parse(":bob!b@h NICK :robert").classify(), IrcEvent::Nick { from: "bob".into(), to: "robert".into() });
        assert_eq!(parse(":s 372 bot :motd line").classify(), IrcEvent::Other);
    }

    #[test]
    fn test_registration_flow() {
        let mut connection = IrcConnection::new("bot", vec!["#tundra".into()]);
        assert_eq!(connection.register()[0], "NICK bot");

        assert_eq!(connection.handle(&parse(":s 433 * bot :Nickname is already in use")), vec!["NICK bot1"]);
        assert_eq!(connection.handle(&parse(":s 433 * bot1 :Nickname is already in use")), vec!["NICK bot2"]);

        assert_eq!(connection.handle(&parse(":s 001 bot2 :Welcome")), vec!["JOIN #tundra"]);
        assert_eq!(connection.state(), IrcState::Registered);
        assert_eq!(connection.handle(&parse("PING :12345")), vec!["PONG :12345"]);

        connection.handle(&parse(":bot2!b@h JOIN #tundra"));
        assert_eq!(connection.state(), IrcState::Joined);
    }
}
