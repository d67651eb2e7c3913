//! Configuration for the nested-set engine's storage binding

use serde::{Deserialize, Serialize};

/// How a mutation transaction acquires SQLite's locks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    /// Locks are taken lazily on first read/write
    Deferred,
    /// The write lock is taken at BEGIN; concurrent mutations queue up
    Immediate,
    /// Readers are locked out as well
    Exclusive,
}

impl TransactionMode {
    pub fn begin_statement(&self) -> &'static str {
        match self {
            TransactionMode::Deferred => "BEGIN DEFERRED",
            TransactionMode::Immediate => "BEGIN IMMEDIATE",
            TransactionMode::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedSetConfig {
    /// How long a connection waits on a locked database before failing (ms)
    pub busy_timeout_ms: u64,

    /// Lock acquisition mode for every mutation transaction
    pub transaction_mode: TransactionMode,

    /// Switch the database to write-ahead logging on open
    pub enable_wal: bool,
}

impl Default for NestedSetConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
            transaction_mode: TransactionMode::Immediate,
            enable_wal: true,
        }
    }
}

impl NestedSetConfig {
    /// Parse and validate a JSON configuration document
    ///
    /// Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.busy_timeout_ms == 0 {
            return Err("busy_timeout_ms must be greater than 0".to_string());
        }

        Ok(())
    }
}
