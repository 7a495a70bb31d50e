//! Scribeflow configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main scribeflow configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScribeflowConfig {
    /// Collaborator backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Processing poller tuning
    #[serde(default)]
    pub poll: PollConfig,

    /// Status reconciler tuning
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Collaborator backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the collaborator API
    pub base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Processing poller tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between content checks, in seconds
    pub interval_secs: u64,

    /// Hard ceiling on total poll duration, in seconds
    pub ceiling_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            ceiling_secs: 300,
        }
    }
}

impl PollConfig {
    /// Interval between content checks
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Hard ceiling on total poll duration
    pub fn ceiling(&self) -> Duration {
        Duration::from_secs(self.ceiling_secs)
    }
}

/// Status reconciler tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Maximum concurrent per-artifact status checks
    pub max_concurrency: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

impl ScribeflowConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file if given, falling back to defaults.
    ///
    /// The `SCRIBEFLOW_BACKEND_URL` environment variable overrides the
    /// configured backend base URL either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        if let Ok(url) = std::env::var("SCRIBEFLOW_BACKEND_URL") {
            config.backend.base_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.is_empty() {
            return Err(Error::Config("backend.base_url must not be empty".to_string()));
        }
        if self.poll.interval_secs == 0 {
            return Err(Error::Config("poll.interval_secs must be positive".to_string()));
        }
        if self.poll.ceiling_secs < self.poll.interval_secs {
            return Err(Error::Config(
                "poll.ceiling_secs must be at least poll.interval_secs".to_string(),
            ));
        }
        if self.reconcile.max_concurrency == 0 {
            return Err(Error::Config(
                "reconcile.max_concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
