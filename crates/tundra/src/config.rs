//! Server configuration file.
//!
//! ```toml
//! server_name = "My Server"
//! motd = "Welcome!"
//! port = 25565
//! verify_names = "balanced"
//!
//! [heartbeat]
//! enabled = true
//! public = false
//!
//! [world]
//! generator = "realistic"
//! template = "island"
//! seed = 1234
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tundra_networking::heartbeat::{HeartbeatConfig, DEFAULT_HEARTBEAT_URL};
use tundra_networking::server::DEFAULT_GREETING;
use tundra_networking::{ServerSettings, DEFAULT_PORT};
use tundra_security::NameVerification;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "tundra.toml";

/// Errors loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Heartbeat settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatSection {
    /// Send heartbeats at all.
    pub enabled: bool,
    /// Listing endpoint.
    pub url: String,
    /// Show the server in the public list.
    pub public: bool,
    /// Seconds between heartbeats.
    pub interval_secs: u64,
    /// Seconds between data file refreshes.
    pub refresh_secs: u64,
    /// File the play URL is written to.
    pub output_file: PathBuf,
    /// Data file shared with the heartbeat thread.
    pub data_file: PathBuf,
    /// Address advertised in the data file.
    pub public_address: String,
}

impl Default for HeartbeatSection {
    fn default() -> Self {
        Self {
            enabled: false,
            url: DEFAULT_HEARTBEAT_URL.to_owned(),
            public: false,
            interval_secs: 45,
            refresh_secs: 60,
            output_file: PathBuf::from("externalurl.txt"),
            data_file: PathBuf::from("heartbeat.txt"),
            public_address: "127.0.0.1".to_owned(),
        }
    }
}

impl HeartbeatSection {
    /// Heartbeat client settings.
    #[must_use]
    pub fn client_config(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            url: self.url.clone(),
            interval: Duration::from_secs(self.interval_secs),
            refresh: Duration::from_secs(self.refresh_secs),
            data_file: self.data_file.clone(),
            output_file: self.output_file.clone(),
        }
    }
}

/// Main world settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    /// World name.
    pub name: String,
    /// Size along X.
    pub width: usize,
    /// Size along Y.
    pub length: usize,
    /// Size along Z (height).
    pub height: usize,
    /// Generator name, looked up case-insensitively.
    pub generator: String,
    /// Realistic template name.
    pub template: Option<String>,
    /// Realistic theme name.
    pub theme: Option<String>,
    /// Random seed; a fresh one is picked when unset.
    pub seed: Option<i64>,
    /// Gzip level file to load instead of generating.
    pub file: Option<PathBuf>,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            name: "main".to_owned(),
            width: 128,
            length: 128,
            height: 64,
            generator: "flat".to_owned(),
            template: None,
            theme: None,
            seed: None,
            file: None,
        }
    }
}

/// Whole configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name in the handshake and the server list.
    pub server_name: String,
    /// Message of the day.
    pub motd: String,
    /// Listening port.
    pub port: u16,
    /// Listening address.
    pub bind_address: IpAddr,
    /// Player slots.
    pub max_players: usize,
    /// Sessions allowed from one address.
    pub max_connections_per_ip: usize,
    /// Name verification policy.
    pub verify_names: NameVerification,
    /// LAN addresses skip name verification.
    pub allow_lan_unverified: bool,
    /// Greeting template.
    pub greeting: String,
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// Heartbeat settings.
    pub heartbeat: HeartbeatSection,
    /// Main world settings.
    pub world: WorldSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let settings = ServerSettings::default();
        Self {
            server_name: settings.name,
            motd: settings.motd,
            port: DEFAULT_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            max_players: settings.max_players,
            max_connections_per_ip: settings.max_connections_per_ip,
            verify_names: settings.verify_names,
            allow_lan_unverified: settings.allow_lan_unverified,
            greeting: DEFAULT_GREETING.to_owned(),
            log_level: "info".to_owned(),
            heartbeat: HeartbeatSection::default(),
            world: WorldSection::default(),
        }
    }
}

impl ServerConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a read, parse or validation error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path: path.to_path_buf(), source }),
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_players == 0 {
            return Err(ConfigError::Invalid("max_players must be at least 1".into()));
        }
        if self.max_connections_per_ip == 0 {
            return Err(ConfigError::Invalid("max_connections_per_ip must be at least 1".into()));
        }
        if self.server_name.trim().is_empty() {
            return Err(ConfigError::Invalid("server_name must not be empty".into()));
        }
        if self.heartbeat.enabled && self.heartbeat.interval_secs == 0 {
            return Err(ConfigError::Invalid("heartbeat.interval_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Login settings for the server context.
    #[must_use]
    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            name: self.server_name.clone(),
            motd: self.motd.clone(),
            max_players: self.max_players,
            max_connections_per_ip: self.max_connections_per_ip,
            verify_names: self.verify_names,
            allow_lan_unverified: self.allow_lan_unverified,
            greeting: self.greeting.clone(),
        }
    }
}
