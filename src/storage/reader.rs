//! Cassette file reader

use std::path::Path;

use tracing::debug;

use super::format::{gunzip, CassetteDocument};
use crate::{ReelError, Result};

/// Read and decode a cassette file
///
/// Compression is decided by the caller's configuration, never by sniffing
/// the file contents.
///
/// # Errors
///
/// Returns a storage error if the file cannot be read or inflated, and a
/// parse error if the contents are not a cassette document
pub fn read_cassette(path: &Path, compressed: bool) -> Result<CassetteDocument> {
    let raw = std::fs::read(path).map_err(|e| ReelError::storage(path, e))?;

    let json = if compressed {
        gunzip(&raw).map_err(|e| ReelError::storage(path, e))?
    } else {
        raw
    };

    let document = CassetteDocument::from_json(&json).map_err(|e| ReelError::parse(path, e))?;

    for (i, episode) in document.episodes.iter().enumerate() {
        episode
            .response
            .validate()
            .map_err(|e| ReelError::parse(path, format!("episode {i}: {e}")))?;
    }

    debug!(
        "Read cassette {} ({} bytes, {} episodes)",
        path.display(),
        json.len(),
        document.episodes.len()
    );

    Ok(document)
}
