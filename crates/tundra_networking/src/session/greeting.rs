//! Post-login greeting template.

use std::time::{SystemTime, UNIX_EPOCH};

/// Values substituted into the greeting template.
///
/// Placeholders: `{SERVER_NAME}`, `{RANK}`, `{PLAYER_NAME}`, `{TIME}`,
/// `{WORLD}`, `{PLAYERS}`, `{WORLDS}`, `{MAX_PLAYERS}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Greeting {
    /// Server name.
    pub server_name: String,
    /// Rank of the player.
    pub rank: String,
    /// Player name.
    pub player_name: String,
    /// Time of day, `HH:MM UTC`.
    pub time: String,
    /// World the player joined.
    pub world: String,
    /// Players online.
    pub players: usize,
    /// Worlds loaded.
    pub worlds: usize,
    /// Player slots.
    pub max_players: usize,
}

impl Greeting {
    /// Fills the template.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{SERVER_NAME}", &self.server_name)
            .replace("{RANK}", &self.rank)
            .replace("{PLAYER_NAME}", &self.player_name)
            .replace("{TIME}", &self.time)
            .replace("{WORLD}", &self.world)
            .replace("{PLAYERS}", &self.players.to_string())
            .replace("{WORLDS}", &self.worlds.to_string())
            .replace("{MAX_PLAYERS}", &self.max_players.to_string())
    }
}

/// Current UTC time of day as `HH:MM UTC`.
#[must_use]
pub fn utc_time_of_day() -> String {
    let seconds = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs()) % 86_400;
    format!("{:02}:{:02} UTC", seconds / 3600, seconds % 3600 / 60)
}
