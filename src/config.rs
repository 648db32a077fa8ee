//! TOML configuration for servers and clients
//!
//! Every field has a default so a configuration file only needs to name the
//! values it overrides. Unknown keys are rejected.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::cache::PolicyKind;
use crate::protocol::MAX_FIXED_FRAME;

/// Smallest message buffer able to hold every fixed-size frame
pub const MIN_MESSAGE_SIZE: usize = MAX_FIXED_FRAME;

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
    Invalid(String)
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Io({})", e),
            ConfigError::Parse(e) => write!(f, "Parse({})", e),
            ConfigError::Invalid(s) => write!(f, "Invalid({})", s),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> ConfigError {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> ConfigError {
        ConfigError::Parse(e)
    }
}

fn check_message_buffers(recv_slots: usize, message_size: usize) -> Result<(), ConfigError> {
    if recv_slots == 0 {
        return Err(ConfigError::Invalid("recv_slots must be at least 1".into()));
    }
    if message_size < MIN_MESSAGE_SIZE {
        return Err(ConfigError::Invalid(format!("message_size must be at least {}", MIN_MESSAGE_SIZE)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_addr: String,

    /// Bytes in the registered allocation pool
    pub pool_size: usize,

    /// Receives pre-posted per connection
    pub recv_slots: usize,

    /// Size of each receive slot and of the send buffer
    pub message_size: usize
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            listen_addr: "0.0.0.0:18515".to_string(),
            pool_size: 64 * 1024 * 1024,
            recv_slots: 4,
            message_size: 256
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> Result<ServerConfig, ConfigError> {
        let cfg: ServerConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<ServerConfig, ConfigError> {
        ServerConfig::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be non-zero".into()));
        }
        check_message_buffers(self.recv_slots, self.message_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub server_addr: String,
    pub recv_slots: usize,
    pub message_size: usize,

    /// Maximum number of objects resident in the client cache
    pub cache_size: usize,

    pub eviction: PolicyKind,

    /// Upper bound on each connection establishment step
    pub connect_timeout_ms: u64
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            server_addr: "127.0.0.1:18515".to_string(),
            recv_slots: 4,
            message_size: 256,
            cache_size: 1024,
            eviction: PolicyKind::LRU,
            connect_timeout_ms: 5000
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<ClientConfig, ConfigError> {
        let cfg: ClientConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<ClientConfig, ConfigError> {
        ClientConfig::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_size == 0 {
            return Err(ConfigError::Invalid("cache_size must be at least 1".into()));
        }
        check_message_buffers(self.recv_slots, self.message_size)
    }
}
