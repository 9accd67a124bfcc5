//! Collaborator interfaces a session calls out to.
//!
//! Bans, player records, chat handling and edit permissions belong to
//! layers above the core. Sessions only see these traits; the in-memory
//! implementations here are enough to run a server and to test one.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tundra_core::{Block, Position};

use crate::player::Player;
use crate::server::ServerContext;

/// Persistent facts about a player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Canonical name.
    pub name: String,
    /// Address of the previous login.
    pub last_address: Option<IpAddr>,
    /// Rank name shown in greetings.
    pub rank: String,
    /// User type byte sent in the server handshake.
    pub user_type: u8,
    /// Skips anti-speedhack checks.
    pub can_speedhack: bool,
    /// Frozen when the previous session ended.
    pub frozen: bool,
    /// Muted when the previous session ended.
    pub muted: bool,
    /// Completed logins.
    pub visits: u32,
}

impl PlayerRecord {
    /// Record for a name never seen before.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            last_address: None,
            rank: "guest".to_owned(),
            user_type: crate::protocol::USER_TYPE_NORMAL,
            can_speedhack: false,
            frozen: false,
            muted: false,
            visits: 0,
        }
    }
}

/// Player database.
pub trait PlayerDirectory: Send + Sync {
    /// Looks a player up by name, case-insensitively.
    fn lookup(&self, name: &str) -> Option<PlayerRecord>;

    /// Records a completed login and returns the updated record.
    fn record_login(&self, name: &str, address: IpAddr) -> PlayerRecord;
}

/// Ban lists and login gates.
pub trait AccessPolicy: Send + Sync {
    /// True if the name is banned.
    fn is_name_banned(&self, name: &str) -> bool;

    /// True if the address is banned.
    fn is_ip_banned(&self, address: IpAddr) -> bool;

    /// Notes a rejected login against a ban record.
    fn record_ban_attempt(&self, name: &str, address: IpAddr);

    /// Banned names that have logged in from `address` before.
    fn banned_accounts_on_ip(&self, address: IpAddr) -> Vec<String>;

    /// Notes a completed login.
    fn note_login(&self, _name: &str, _address: IpAddr) {}

    /// External paid-account check.
    fn is_paid(&self, _name: &str) -> bool {
        true
    }

    /// Last chance to refuse a login that passed every other check.
    fn allow_connect(&self, _name: &str, _address: IpAddr) -> bool {
        true
    }
}

/// A chat handler failure; the player sees a generic error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ChatError(pub String);

/// Receives validated chat text.
pub trait ChatHandler: Send + Sync {
    /// Handles one message from `player`.
    fn handle(&self, server: &ServerContext, player: &Arc<Player>, text: &str) -> Result<(), ChatError>;
}

/// A block edit about to be applied or just applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockChange {
    /// X.
    pub x: i32,
    /// Y.
    pub y: i32,
    /// Height.
    pub z: i32,
    /// Block before the edit.
    pub old: Block,
    /// Block after the edit.
    pub new: Block,
}

/// Block edit hooks.
pub trait BlockHooks: Send + Sync {
    /// Returns false to cancel the edit; the client is sent the old block.
    fn placing(&self, _player: &Player, _change: &BlockChange) -> bool {
        true
    }

    /// Called after the edit was applied.
    fn placed(&self, _player: &Player, _change: &BlockChange) {}
}

/// Movement veto.
pub trait MovementHook: Send + Sync {
    /// Returns false to send the player back to `from`.
    fn allow(&self, _player: &Player, _from: Position, _to: Position) -> bool {
        true
    }
}

/// Hooks that allow everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl BlockHooks for AllowAll {}
impl MovementHook for AllowAll {}

/// Chat that relays every message to the whole server.
#[derive(Clone, Copy, Debug, Default)]
pub struct BroadcastChat;

impl ChatHandler for BroadcastChat {
    fn handle(&self, server: &ServerContext, player: &Arc<Player>, text: &str) -> Result<(), ChatError> {
        server.broadcast_message(&format!("{}: &f{}", player.name(), text));
        Ok(())
    }
}

/// Player records kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: RwLock<HashMap<String, PlayerRecord>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a record.
    pub fn insert(&self, record: PlayerRecord) {
        self.records.write().insert(record.name.to_ascii_lowercase(), record);
    }
}

impl PlayerDirectory for InMemoryDirectory {
    fn lookup(&self, name: &str) -> Option<PlayerRecord> {
        self.records.read().get(&name.to_ascii_lowercase()).cloned()
    }

    fn record_login(&self, name: &str, address: IpAddr) -> PlayerRecord {
        let mut records = self.records.write();
        let record = records.entry(name.to_ascii_lowercase()).or_insert_with(|| PlayerRecord::new(name));
        record.last_address = Some(address);
        record.visits += 1;
        record.clone()
    }
}

/// A rejected login against a ban.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BanAttempt {
    /// Name used.
    pub name: String,
    /// Address used.
    pub address: IpAddr,
}

/// Ban lists kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryAccess {
    banned_names: RwLock<HashSet<String>>,
    banned_ips: RwLock<HashSet<IpAddr>>,
    accounts_by_ip: RwLock<HashMap<IpAddr, HashSet<String>>>,
    attempts: Mutex<Vec<BanAttempt>>,
}

impl InMemoryAccess {
    /// Creates empty ban lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bans a name.
    pub fn ban_name(&self, name: &str) {
        self.banned_names.write().insert(name.to_ascii_lowercase());
    }

    /// Bans an address.
    pub fn ban_ip(&self, address: IpAddr) {
        self.banned_ips.write().insert(address);
    }

    /// Rejected logins so far.
    #[must_use]
    pub fn attempts(&self) -> Vec<BanAttempt> {
        self.attempts.lock().clone()
    }
}

impl AccessPolicy for InMemoryAccess {
    fn is_name_banned(&self, name: &str) -> bool {
        self.banned_names.read().contains(&name.to_ascii_lowercase())
    }

    fn is_ip_banned(&self, address: IpAddr) -> bool {
        self.banned_ips.read().contains(&address)
    }

    fn record_ban_attempt(&self, name: &str, address: IpAddr) {
        self.attempts.lock().push(BanAttempt { name: name.to_owned(), address });
    }

    fn banned_accounts_on_ip(&self, address: IpAddr) -> Vec<String> {
        let banned = self.banned_names.read();
        let mut names: Vec<String> = self
            .accounts_by_ip
            .read()
            .get(&address)
            .map(|names| names.iter().filter(|n| banned.contains(*n)).cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn note_login(&self, name: &str, address: IpAddr) {
        self.accounts_by_ip.write().entry(address).or_default().insert(name.to_ascii_lowercase());
    }
}

/// Everything a session calls out to.
#[derive(Clone)]
pub struct Collaborators {
    /// Bans and login gates.
    pub access: Arc<dyn AccessPolicy>,
    /// Player records.
    pub directory: Arc<dyn PlayerDirectory>,
    /// Chat.
    pub chat: Arc<dyn ChatHandler>,
    /// Block edits.
    pub blocks: Arc<dyn BlockHooks>,
    /// Movement veto.
    pub movement: Arc<dyn MovementHook>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            access: Arc::new(InMemoryAccess::new()),
            directory: Arc::new(InMemoryDirectory::new()),
            chat: Arc::new(BroadcastChat),
            blocks: Arc::new(AllowAll),
            movement: Arc::new(AllowAll),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const HOME: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));

    #[test]
    fn test_directory_records_logins() {
        let directory = InMemoryDirectory::new();
        assert!(directory.lookup("Notch").is_none());
        let record = directory.record_login("Notch", HOME);
        assert_eq!(record.visits, 1);
        assert_eq!(directory.lookup("notch").unwrap().last_address, Some(HOME));
        assert_eq!(directory.record_login("NOTCH", HOME).visits, 2);
    }

    #[test]
    fn test_bans_and_alts() {
        let access = InMemoryAccess::new();
        access.note_login("Griefer", HOME);
        access.note_login("Alt", HOME);
        assert!(access.banned_accounts_on_ip(HOME).is_empty());

        access.ban_name("griefer");
        assert!(access.is_name_banned("GRIEFER"));
        assert_eq!(access.banned_accounts_on_ip(HOME), vec!["griefer".to_owned()]);

        access.ban_ip(HOME);
        assert!(access.is_ip_banned(HOME));
        access.record_ban_attempt("Griefer", HOME);
        assert_eq!(access.attempts(), vec![BanAttempt { name: "Griefer".into(), address: HOME }]);
    }
}
