//! State shared by every session: settings, worlds, the player roster.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tundra_security::NameVerification;

use crate::heartbeat::HeartbeatData;
use crate::player::Player;
use crate::session::{Collaborators, LeaveReason};
use crate::world::World;

/// Length of the name verification salt.
pub const SALT_LENGTH: usize = 16;

/// Greeting sent after login when none is configured.
pub const DEFAULT_GREETING: &str = "&eWelcome to {SERVER_NAME}, {PLAYER_NAME}! &f{PLAYERS} of {MAX_PLAYERS} online.";

/// Server-wide settings used during login.
#[derive(Clone, Debug)]
pub struct ServerSettings {
    /// Name shown in the handshake and server list.
    pub name: String,
    /// Message of the day shown under the name while loading.
    pub motd: String,
    /// Player slots.
    pub max_players: usize,
    /// Simultaneous sessions allowed from one address.
    pub max_connections_per_ip: usize,
    /// Name verification policy.
    pub verify_names: NameVerification,
    /// Let LAN addresses skip name verification.
    pub allow_lan_unverified: bool,
    /// Greeting template; see [`crate::session::Greeting`].
    pub greeting: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: "Tundra Server".to_owned(),
            motd: "Welcome!".to_owned(),
            max_players: 32,
            max_connections_per_ip: 3,
            verify_names: NameVerification::default(),
            allow_lan_unverified: true,
            greeting: DEFAULT_GREETING.to_owned(),
        }
    }
}

/// Everything sessions share.
#[derive(Debug)]
pub struct ServerContext {
    settings: ServerSettings,
    salt: String,
    collaborators: Collaborators,
    worlds: RwLock<BTreeMap<String, Arc<World>>>,
    main_world: RwLock<Arc<World>>,
    players: RwLock<BTreeMap<u64, Arc<Player>>>,
    connections: Mutex<HashMap<IpAddr, usize>>,
    next_key: AtomicU64,
    shutdown: AtomicBool,
}

impl ServerContext {
    /// Creates a context with `main_world` as the spawn world.
    #[must_use]
    pub fn new(settings: ServerSettings, collaborators: Collaborators, main_world: World) -> Self {
        let salt: String = rand::thread_rng().sample_iter(&Alphanumeric).take(SALT_LENGTH).map(char::from).collect();
        let main_world = Arc::new(main_world);
        let mut worlds = BTreeMap::new();
        worlds.insert(main_world.name().to_ascii_lowercase(), Arc::clone(&main_world));
        Self {
            settings,
            salt,
            collaborators,
            worlds: RwLock::new(worlds),
            main_world: RwLock::new(main_world),
            players: RwLock::new(BTreeMap::new()),
            connections: Mutex::new(HashMap::new()),
            next_key: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Login settings.
    #[must_use]
    pub const fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Salt clients must hash their name with.
    #[must_use]
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Collaborator hooks.
    #[must_use]
    pub const fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Allocates a session key.
    pub fn next_key(&self) -> u64 {
        self.next_key.fetch_add(1, Ordering::Relaxed)
    }

    /// World new players spawn in.
    #[must_use]
    pub fn main_world(&self) -> Arc<World> {
        Arc::clone(&self.main_world.read())
    }

    /// Adds a world, returning false if the name is taken.
    pub fn add_world(&self, world: World) -> bool {
        let mut worlds = self.worlds.write();
        let key = world.name().to_ascii_lowercase();
        if worlds.contains_key(&key) {
            return false;
        }
        worlds.insert(key, Arc::new(world));
        true
    }

    /// Looks a world up by name, case-insensitively.
    #[must_use]
    pub fn find_world(&self, name: &str) -> Option<Arc<World>> {
        self.worlds.read().get(&name.to_ascii_lowercase()).cloned()
    }

    /// Number of loaded worlds.
    #[must_use]
    pub fn world_count(&self) -> usize {
        self.worlds.read().len()
    }

    /// Reserves a connection slot for `address`.
    pub fn open_connection(&self, address: IpAddr) -> bool {
        let mut connections = self.connections.lock();
        let count = connections.entry(address).or_insert(0);
        if *count >= self.settings.max_connections_per_ip {
            return false;
        }
        *count += 1;
        true
    }

    /// Releases a slot taken by [`Self::open_connection`].
    pub fn release_connection(&self, address: IpAddr) {
        let mut connections = self.connections.lock();
        if let Some(count) = connections.get_mut(&address) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                connections.remove(&address);
            }
        }
    }

    /// Adds a player to the roster unless the server is full.
    ///
    /// Players already asked to leave do not hold a slot.
    pub fn register_player(&self, player: Arc<Player>) -> bool {
        let mut players = self.players.write();
        let occupied = players.values().filter(|p| !p.is_kicked()).count();
        if occupied >= self.settings.max_players {
            return false;
        }
        players.insert(player.key(), player);
        true
    }

    /// Removes a player from the roster.
    pub fn unregister_player(&self, key: u64) -> Option<Arc<Player>> {
        self.players.write().remove(&key)
    }

    /// Online player by name, case-insensitively.
    #[must_use]
    pub fn find_player(&self, name: &str) -> Option<Arc<Player>> {
        self.players.read().values().find(|p| p.name().eq_ignore_ascii_case(name)).cloned()
    }

    /// Online players.
    #[must_use]
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players.read().values().cloned().collect()
    }

    /// Number of online players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    /// Sends chat text to every online player.
    pub fn broadcast_message(&self, text: &str) {
        for player in self.players.read().values() {
            player.message(text);
        }
    }

    /// Asks every session to close.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for player in self.players.read().values() {
            player.kick(LeaveReason::ServerShutdown, LeaveReason::ServerShutdown.default_message());
        }
    }

    /// True once [`Self::shutdown`] was called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Current values for the heartbeat data file.
    #[must_use]
    pub fn heartbeat_data(&self, address: &str, port: u16, public: bool, url: Option<String>) -> HeartbeatData {
        HeartbeatData {
            salt: self.salt.clone(),
            address: address.to_owned(),
            port,
            players: self.player_count(),
            max_players: self.settings.max_players,
            name: self.settings.name.clone(),
            public,
            url,
        }
    }
}
