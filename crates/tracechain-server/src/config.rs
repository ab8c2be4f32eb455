use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracechain_ledger::LedgerConfig;
use tracechain_store::JournalOptions;

use crate::error::{ServerError, ServerResult};

/// Server settings, loadable from a TOML file.
///
/// ```toml
/// bind_addr = "0.0.0.0:8080"
/// data_dir = "/var/lib/tracechain"
///
/// [ledger]
/// signer = "PoA"
/// max_append_retries = 5
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the ledger journal.
    pub data_dir: PathBuf,
    /// `fsync` the journal after every record.
    pub sync_every_write: bool,
    pub ledger: LedgerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            data_dir: PathBuf::from("tracechain-data"),
            sync_every_write: true,
            ledger: LedgerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml(source: &str) -> ServerResult<Self> {
        toml::from_str(source).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&source)
    }

    pub fn journal_options(&self) -> JournalOptions {
        JournalOptions {
            sync_every_write: self.sync_every_write,
        }
    }
}
