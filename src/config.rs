//! Configuration types for Reel

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ReelError, Result};

/// Default directory holding cassette files
pub const DEFAULT_FIXTURES_DIR: &str = "fixtures/vcr";

/// Session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// No session: requests pass straight through
    #[default]
    Stopped,
    /// Real calls are made and captured
    Recording,
    /// Responses are served from the cassette
    Replaying,
}

impl Mode {
    /// Check if mode is Recording
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self, Mode::Recording)
    }

    /// Check if mode is Replaying
    #[must_use]
    pub fn is_replaying(&self) -> bool {
        matches!(self, Mode::Replaying)
    }
}

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcrConfig {
    /// Directory for storing/loading cassettes
    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: PathBuf,
    /// Gzip cassette files
    #[serde(default)]
    pub compress: bool,
    /// Fail `stop` when a replay leaves episodes unplayed
    #[serde(default)]
    pub require_all_played: bool,
    /// Body substitutions applied before anything is persisted
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    /// Resource limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// One plaintext to replacement substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Text to hide
    pub plain: String,
    /// Text written in its place
    pub replacement: String,
}

/// Resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum captured request body in bytes
    pub max_request_size: usize,
    /// Maximum captured response body in bytes
    pub max_response_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 16 * 1024 * 1024,   // 16 MB
            max_response_size: 256 * 1024 * 1024, // 256 MB
        }
    }
}

fn default_fixtures_dir() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURES_DIR)
}

impl Default for VcrConfig {
    fn default() -> Self {
        Self {
            fixtures_dir: default_fixtures_dir(),
            compress: false,
            require_all_played: false,
            filters: Vec::new(),
            limits: LimitsConfig::default(),
        }
    }
}

impl VcrConfig {
    /// Config rooted at `fixtures_dir`, everything else default
    #[must_use]
    pub fn with_fixtures_dir(fixtures_dir: impl Into<PathBuf>) -> Self {
        Self {
            fixtures_dir: fixtures_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReelError::Config(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ReelError::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.fixtures_dir.as_os_str().is_empty() {
            return Err(ReelError::Config(
                "fixtures_dir cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (i, rule) in self.filters.iter().enumerate() {
            if rule.plain.is_empty() {
                return Err(ReelError::Config(format!(
                    "Filter {i}: plain text cannot be empty"
                )));
            }
            if !seen.insert(rule.plain.as_str()) {
                return Err(ReelError::Config(format!(
                    "Filter {i}: duplicate plain text '{}'",
                    rule.plain
                )));
            }
        }

        if self.limits.max_request_size == 0 || self.limits.max_response_size == 0 {
            return Err(ReelError::Config(
                "body size limits must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
