//! Core configuration.
//!
//! # Responsibility
//! - Describe knobs the surrounding system sets when wiring core together.
//! - Parse them from JSON with defaults for every omitted field.
//!
//! # Invariants
//! - An empty JSON object yields `CoreConfig::default()`.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_WORKER_NAME: &str = "rewind-worker";
const DEFAULT_MAX_RECORDED_FAILURES: usize = 20;

/// How the coordinator admits queued asynchronous processes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// One asynchronous process at a time across all projects.
    #[default]
    Serial,
    /// At most one asynchronous process per project.
    PerTarget,
}

/// Process coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub policy: AdmissionPolicy,
    /// Failed processes kept for `ProcessCoordinator::recent_failures`.
    pub max_recorded_failures: usize,
    /// Worker thread name prefix.
    pub worker_name: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            policy: AdmissionPolicy::default(),
            max_recorded_failures: DEFAULT_MAX_RECORDED_FAILURES,
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

/// Top-level core settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<String>,
    pub coordinator: CoordinatorConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parses settings from a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coordinator.worker_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "coordinator.worker_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}
