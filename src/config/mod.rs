mod file;

pub use file::Transport;

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("command_timeout must be at least 1 second")]
    InvalidTimeout,
}

/// Parse a TOML config file and return a ServerConfig
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ConfigError> {
    let spec = file::ServerConfigSpec::from_file(path.as_ref())?;
    ServerConfig::from_spec(spec)
}

/// Parse TOML config contents and return a ServerConfig
pub fn from_str(contents: &str) -> Result<ServerConfig, ConfigError> {
    let spec = file::ServerConfigSpec::parse(contents)?;
    ServerConfig::from_spec(spec)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub speaker_config: PathBuf,
    pub command_timeout: Duration,
    pub transport: Transport,
}

impl ServerConfig {
    fn from_spec(spec: file::ServerConfigSpec) -> Result<Self, ConfigError> {
        if spec.command_timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(Self {
            listen: spec.listen,
            speaker_config: spec.speaker_config,
            command_timeout: Duration::from_secs(spec.command_timeout),
            transport: spec.transport,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let spec = file::ServerConfigSpec::default();
        Self {
            listen: spec.listen,
            speaker_config: spec.speaker_config,
            command_timeout: Duration::from_secs(spec.command_timeout),
            transport: spec.transport,
        }
    }
}
