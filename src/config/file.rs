use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConfigError;

struct Defaults {}

impl Defaults {
    fn listen() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 5000))
    }

    fn speaker_config() -> PathBuf {
        PathBuf::from("/etc/exabgp/exabgp.conf")
    }

    fn command_timeout() -> u64 {
        10
    }

    fn command_pipe() -> PathBuf {
        PathBuf::from("/run/exabgp/exabgp.in")
    }

    fn response_pipe() -> PathBuf {
        PathBuf::from("/run/exabgp/exabgp.out")
    }
}

/// How commands reach the speaker
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transport {
    /// A pair of named pipes the speaker reads commands from and writes replies to
    Pipes {
        #[serde(default = "Defaults::command_pipe")]
        command: PathBuf,
        #[serde(default = "Defaults::response_pipe")]
        response: PathBuf,
    },
    /// Launched by the speaker as an API process: commands on stdout, replies on stdin
    Stdio,
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Pipes {
            command: Defaults::command_pipe(),
            response: Defaults::response_pipe(),
        }
    }
}

/// Config (toml) representation of the daemon config
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ServerConfigSpec {
    // JSON-RPC API listening address
    #[serde(default = "Defaults::listen")]
    pub(super) listen: SocketAddr,
    // Speaker config file holding the neighbor stanzas
    #[serde(default = "Defaults::speaker_config")]
    pub(super) speaker_config: PathBuf,
    // Seconds to wait for the speaker to finish answering a command
    #[serde(default = "Defaults::command_timeout")]
    pub(super) command_timeout: u64,
    #[serde(default)]
    pub(super) transport: Transport,
}

impl Default for ServerConfigSpec {
    fn default() -> Self {
        Self {
            listen: Defaults::listen(),
            speaker_config: Defaults::speaker_config(),
            command_timeout: Defaults::command_timeout(),
            transport: Transport::default(),
        }
    }
}

impl ServerConfigSpec {
    pub(super) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub(super) fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}
