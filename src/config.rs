use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{codec::DEFAULT_MAX_TX_BYTES, state::in_memory_state::InMemoryState};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Transactions, and the records inside them, larger than this are rejected as undecodable.
    #[serde(default = "default_max_tx_bytes")]
    pub max_tx_bytes: u64,
    /// Run the kind's Check against canonical state before every Deliver.
    #[serde(default = "default_revalidate_on_deliver")]
    pub revalidate_on_deliver: bool,
    /// Total records the in-memory ledger may hold; unbounded when absent.
    #[serde(default)]
    pub max_records: Option<usize>,
}

fn default_max_tx_bytes() -> u64 {
    DEFAULT_MAX_TX_BYTES
}

fn default_revalidate_on_deliver() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_tx_bytes: default_max_tx_bytes(),
            revalidate_on_deliver: default_revalidate_on_deliver(),
            max_records: None,
        }
    }
}

impl AppConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn in_memory_state(&self) -> InMemoryState {
        match self.max_records {
            Some(max) => InMemoryState::with_capacity_limit(max),
            None => InMemoryState::new(),
        }
    }
}
