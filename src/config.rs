//! Store configuration
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration for an in-memory store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_CHECKPOINT_INTERVAL: u64 = 16;
const MAX_CHECKPOINT_INTERVAL: u64 = 1 << 20;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// What a commit does when another commit holds the writer lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Wait for the writer lock (bounded by `commit_timeout_ms` if set)
    #[default]
    Blocking,
    /// Return `ConcurrencyConflict` immediately
    FailFast,
}

/// Versioned store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Data directory (None = in-memory only)
    pub data_path: Option<PathBuf>,
    pub commit_policy: CommitPolicy,
    /// Upper bound on the wait for the writer lock under `Blocking`
    pub commit_timeout_ms: Option<u64>,
    /// Cache a full snapshot every N versions (0 = never)
    pub checkpoint_interval: u64,
    /// fsync the commit log after every append
    pub sync_writes: bool,
    pub max_quads_per_commit: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            commit_policy: CommitPolicy::Blocking,
            commit_timeout_ms: None,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            sync_writes: true,
            max_quads_per_commit: None,
        }
    }
}

impl StoreConfig {
    /// In-memory configuration with defaults
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Persistent configuration rooted at `path`
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.commit_policy = policy;
        self
    }

    pub fn with_checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: StoreConfig = if yaml.trim().is_empty() {
            StoreConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.checkpoint_interval > MAX_CHECKPOINT_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "checkpoint_interval {} exceeds {}",
                self.checkpoint_interval, MAX_CHECKPOINT_INTERVAL
            )));
        }
        if self.max_quads_per_commit == Some(0) {
            return Err(ConfigError::Invalid(
                "max_quads_per_commit must be positive".to_string(),
            ));
        }
        if self.commit_policy == CommitPolicy::FailFast && self.commit_timeout_ms.is_some() {
            return Err(ConfigError::Invalid(
                "commit_timeout_ms only applies to the blocking policy".to_string(),
            ));
        }
        Ok(())
    }
}
