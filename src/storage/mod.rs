//! Cassette storage: one JSON document per cassette name

pub mod format;
mod reader;
mod writer;

use std::path::{Path, PathBuf};

use tracing::info;

pub use format::{CassetteDocument, CASSETTE_EXTENSION, COMPRESSED_EXTENSION};
pub use reader::read_cassette;
pub use writer::write_cassette;

use crate::episode::Episode;
use crate::{ReelError, Result};

/// Longest accepted cassette name, in bytes
pub const MAX_NAME_LEN: usize = 255;

/// A named, ordered list of episodes bound to one test session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cassette {
    name: String,
    fixtures_dir: PathBuf,
    compress: bool,
    episodes: Vec<Episode>,
}

impl Cassette {
    /// Create an empty cassette
    ///
    /// # Errors
    ///
    /// Returns a usage error if the name cannot be used as a file name
    pub fn new(name: &str, fixtures_dir: impl Into<PathBuf>, compress: bool) -> Result<Self> {
        validate_cassette_name(name)?;

        Ok(Self {
            name: name.to_string(),
            fixtures_dir: fixtures_dir.into(),
            compress,
            episodes: Vec::new(),
        })
    }

    /// Cassette name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the file is gzipped
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compress
    }

    /// `<fixtures_dir>/<name>.json`, or `.json.gz` when compressed
    #[must_use]
    pub fn path(&self) -> PathBuf {
        cassette_path(&self.fixtures_dir, &self.name, self.compress)
    }

    /// Whether a persisted cassette file exists
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Recorded episodes in call order
    #[must_use]
    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    /// Number of recorded episodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Append a freshly recorded episode
    pub fn push(&mut self, episode: Episode) {
        self.episodes.push(episode);
    }

    /// Hand the episodes over, leaving the cassette empty
    pub fn take_episodes(&mut self) -> Vec<Episode> {
        std::mem::take(&mut self.episodes)
    }

    /// Replace the in-memory episodes with the persisted ones
    ///
    /// # Errors
    ///
    /// Returns a storage or parse error if the file cannot be loaded
    pub fn load(&mut self) -> Result<()> {
        let path = self.path();
        let document = read_cassette(&path, self.compress)?;
        self.episodes = document.episodes;

        info!(
            "Loaded cassette '{}': {} episodes",
            self.name,
            self.episodes.len()
        );
        Ok(())
    }

    /// Persist the episodes
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be written
    pub fn save(&self) -> Result<()> {
        let document = CassetteDocument {
            name: self.name.clone(),
            episodes: self.episodes.clone(),
        };
        write_cassette(&self.path(), &document, self.compress)?;

        info!(
            "Saved cassette '{}': {} episodes",
            self.name,
            self.episodes.len()
        );
        Ok(())
    }
}

/// File path of cassette `name` under `fixtures_dir`
#[must_use]
pub fn cassette_path(fixtures_dir: &Path, name: &str, compress: bool) -> PathBuf {
    let file_name = if compress {
        format!("{name}.{CASSETTE_EXTENSION}.{COMPRESSED_EXTENSION}")
    } else {
        format!("{name}.{CASSETTE_EXTENSION}")
    };
    fixtures_dir.join(file_name)
}

/// Validate a cassette name
///
/// # Errors
///
/// Returns a usage error if the name is empty, too long, or could escape the
/// fixtures directory
pub fn validate_cassette_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ReelError::Usage(
            "cassette name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ReelError::Usage(format!(
            "cassette name too long: {} > {MAX_NAME_LEN}",
            name.len()
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(ReelError::Usage(
            "cassette name cannot contain path separators".to_string(),
        ));
    }

    if name.starts_with('.') {
        return Err(ReelError::Usage(
            "cassette name cannot start with dot".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(ReelError::Usage(
            "cassette name cannot contain null bytes".to_string(),
        ));
    }

    if name.contains("..") {
        return Err(ReelError::Usage(
            "cassette name cannot contain '..'".to_string(),
        ));
    }

    Ok(())
}
