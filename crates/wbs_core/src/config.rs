//! Engine configuration.
//!
//! All fields are optional in serialized form; missing keys take defaults.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_CREATED_BY: &str = "wbs-engine";
const DEFAULT_GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stamped as `createdBy` on create payloads.
    pub created_by: String,
    /// Default draft span in days.
    pub draft_duration_days: i64,
    /// Minimum chart span for non-milestone rows with no positive duration.
    pub min_bar_span_days: i64,
    /// Whether groups first seen in a fetch start expanded.
    pub expand_groups_on_load: bool,
    /// Fallback user message when the server sent no error text.
    pub generic_error_message: String,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            created_by: DEFAULT_CREATED_BY.to_string(),
            draft_duration_days: 1,
            min_bar_span_days: 1,
            expand_groups_on_load: true,
            generic_error_message: DEFAULT_GENERIC_ERROR_MESSAGE.to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config document.
    pub fn from_json_str(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rotated log files. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}
