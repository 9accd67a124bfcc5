//! Chat line layout.
//!
//! Classic clients show at most 64 characters per message packet and some
//! crash on a colour code at the very end of a line. Text is split on
//! `\n`, shorthand colours are expanded, then words are packed greedily
//! into lines that each start with the caller's prefix and the colour that
//! was active where the previous line broke.

use super::packets::Packet;
use super::serialization::STRING_LENGTH;

/// Shorthand colour codes and the colour each stands for.
const SHORTHAND: [(char, char); 8] = [
    ('s', 'e'), // system
    ('y', '2'), // say
    ('p', 'b'), // private message
    ('r', '2'), // announcement
    ('h', 'a'), // help
    ('w', 'c'), // warning
    ('m', '5'), // /me
    ('i', '5'), // irc
];

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Colour(char),
    Space(usize),
    Word(Vec<char>),
}

fn expand_shorthand(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        out.push(ch);
        if ch != '&' {
            continue;
        }
        if let Some(&next) = chars.peek() {
            let lower = next.to_ascii_lowercase();
            if let Some(&(_, colour)) = SHORTHAND.iter().find(|(short, _)| *short == lower) {
                out.push(colour);
                chars.next();
            }
        }
    }
    out
}

/// Splits a line into colour codes, whitespace runs and words.
///
/// Consecutive colour codes collapse into the last one.
fn tokenize(line: &str) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '&' && chars.get(i + 1).is_some_and(char::is_ascii_hexdigit) {
            let code = chars[i + 1].to_ascii_lowercase();
            if let Some(Token::Colour(last)) = tokens.last_mut() {
                *last = code;
            } else {
                tokens.push(Token::Colour(code));
            }
            i += 2;
        } else if ch.is_whitespace() {
            let start = i;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token::Space(i - start));
        } else {
            let start = i;
            while i < chars.len()
                && !chars[i].is_whitespace()
                && !(chars[i] == '&' && chars.get(i + 1).is_some_and(char::is_ascii_hexdigit))
            {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].to_vec()));
        }
    }
    tokens
}

struct LineBuilder<'a> {
    prefix: &'a str,
    lines: Vec<String>,
    current: String,
    len: usize,
    /// Colour in effect at the write position.
    active: Option<char>,
    /// Colour switched to but not yet written.
    pending: Option<char>,
    has_content: bool,
}

impl<'a> LineBuilder<'a> {
    fn new(prefix: &'a str) -> Self {
        let mut builder = Self {
            prefix,
            lines: Vec::new(),
            current: String::new(),
            len: 0,
            active: None,
            pending: None,
            has_content: false,
        };
        builder.start_line(None);
        builder
    }

    fn start_line(&mut self, carry: Option<char>) {
        self.current = self.prefix.to_owned();
        self.len = self.prefix.chars().count();
        self.has_content = false;
        if let Some(colour) = carry {
            self.current.push('&');
            self.current.push(colour);
            self.len += 2;
        }
    }

    fn free(&self) -> usize {
        STRING_LENGTH.saturating_sub(self.len)
    }

    /// Width a fresh continuation line leaves for text.
    fn fresh_free(&self) -> usize {
        let carry = if self.pending.or(self.active).is_some() { 2 } else { 0 };
        STRING_LENGTH.saturating_sub(self.prefix.chars().count() + carry)
    }

    fn break_line(&mut self) {
        if self.has_content {
            self.lines.push(trim_line(&self.current, self.prefix.len()));
        }
        let carry = self.pending.take().or(self.active);
        self.active = carry;
        self.start_line(carry);
    }

    fn colour(&mut self, code: char) {
        if self.pending.is_none() && self.active == Some(code) {
            return;
        }
        self.pending = Some(code);
    }

    fn flush_pending(&mut self) {
        if let Some(code) = self.pending.take() {
            self.current.push('&');
            self.current.push(code);
            self.len += 2;
            self.active = Some(code);
        }
    }

    fn pending_len(&self) -> usize {
        if self.pending.is_some() {
            2
        } else {
            0
        }
    }

    fn space(&mut self, count: usize) {
        if !self.has_content {
            return;
        }
        let count = count.min(self.free());
        self.current.extend(std::iter::repeat(' ').take(count));
        self.len += count;
    }

    fn word(&mut self, word: &[char]) {
        if self.pending_len() + word.len() <= self.free() {
            self.push_chars(word);
            return;
        }
        if word.len() <= self.fresh_free() {
            self.break_line();
            self.push_chars(word);
            return;
        }
        // Longer than any line: fill what is left, then keep splitting
        let mut rest = word;
        while !rest.is_empty() {
            if self.free() <= self.pending_len() {
                self.break_line();
            }
            let take = self.free().saturating_sub(self.pending_len()).min(rest.len());
            if take == 0 {
                // The prefix alone fills the line
                return;
            }
            self.push_chars(&rest[..take]);
            rest = &rest[take..];
        }
    }

    fn push_chars(&mut self, chars: &[char]) {
        self.flush_pending();
        self.current.extend(chars.iter());
        self.len += chars.len();
        self.has_content = true;
    }

    fn finish(mut self) -> Vec<String> {
        if self.has_content {
            let trimmed = trim_line(&self.current, self.prefix.len());
            self.lines.push(trimmed);
        }
        self.lines
    }
}

/// Drops trailing whitespace and colour codes past the prefix.
fn trim_line(line: &str, prefix_len: usize) -> String {
    let mut end = line.len();
    loop {
        let body = &line[prefix_len.min(end)..end];
        let trimmed = body.trim_end();
        if trimmed.len() != body.len() {
            end = prefix_len.min(end) + trimmed.len();
            continue;
        }
        let bytes = body.as_bytes();
        if bytes.len() >= 2 && bytes[bytes.len() - 2] == b'&' && bytes[bytes.len() - 1].is_ascii_hexdigit() {
            end -= 2;
            continue;
        }
        break;
    }
    line[..end].to_owned()
}

/// Lays out `text` as Classic chat lines, each beginning with `prefix`.
#[must_use]
pub fn wrap_lines(prefix: &str, text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        let mut builder = LineBuilder::new(prefix);
        for token in tokenize(&expand_shorthand(raw)) {
            match token {
                Token::Colour(code) => builder.colour(code),
                Token::Space(count) => builder.space(count),
                Token::Word(word) => builder.word(&word),
            }
        }
        lines.extend(builder.finish());
    }
    lines
}

/// Message packets for `text`, one per wrapped line.
#[must_use]
pub fn chat_packets(prefix: &str, text: &str) -> Vec<Packet> {
    wrap_lines(prefix, text).into_iter().map(|text| Packet::Message { id: 0, text }).collect()
}
