//! Configuration loading and resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default session-control server port
pub const DEFAULT_SERVER_PORT: u16 = 8554;
/// Default local port for unit delivery
pub const DEFAULT_RTP_PORT: u16 = 25000;
/// Default buffer capacity (target stream length in units)
pub const DEFAULT_BUFFER_CAPACITY: usize = 500;
/// Default presentation interval (50 ms = 20 units/sec)
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 50;

/// Player configuration as stored in the TOML config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Session-control server host
    pub server_host: String,
    /// Session-control server port
    pub server_port: u16,
    /// Local UDP port for unit delivery
    pub rtp_port: u16,
    /// Unit buffer capacity
    pub buffer_capacity: usize,
    /// Presentation clock interval in milliseconds
    pub frame_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: DEFAULT_SERVER_PORT,
            rtp_port: DEFAULT_RTP_PORT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

impl PlayerConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                let config: PlayerConfig = toml::from_str(&contents)
                    .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;
                config.validate()?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject values the playback engine cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(Error::Config("buffer_capacity must be non-zero".into()));
        }
        if self.frame_interval_ms == 0 {
            return Err(Error::Config("frame_interval_ms must be non-zero".into()));
        }
        Ok(())
    }
}

/// Resolve the server host following the standard priority order:
/// CLI argument, then environment variable, then config file, then default
pub fn resolve_server_host(cli_arg: Option<&str>, env_var_name: &str, config: &PlayerConfig) -> String {
    // Priority 1: Command-line argument
    if let Some(host) = cli_arg {
        return host.to_string();
    }

    // Priority 2: Environment variable
    if let Ok(host) = std::env::var(env_var_name) {
        if !host.is_empty() {
            return host;
        }
    }

    // Priority 3 / 4: Config file value (carries the compiled default)
    config.server_host.clone()
}
