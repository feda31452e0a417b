//! Cassette file writer

use std::io;
use std::path::Path;

use tracing::debug;

use super::format::{gzip, CassetteDocument};
use crate::{ReelError, Result};

/// Encode and write a cassette file, creating its directory if needed
///
/// # Errors
///
/// Returns a storage error if the directory or file cannot be written
pub fn write_cassette(path: &Path, document: &CassetteDocument, compressed: bool) -> Result<()> {
    let json = document
        .to_json()
        .map_err(|e| ReelError::storage(path, io::Error::new(io::ErrorKind::InvalidData, e)))?;

    let data = if compressed {
        gzip(&json).map_err(|e| ReelError::storage(path, e))?
    } else {
        json
    };

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|e| ReelError::storage(dir, e))?;
        }
    }

    std::fs::write(path, &data).map_err(|e| ReelError::storage(path, e))?;

    debug!(
        "Wrote cassette {} ({} bytes, {} episodes)",
        path.display(),
        data.len(),
        document.episodes.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::reader::read_cassette;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fixtures/vcr/nested.json");
        let document = CassetteDocument {
            name: "nested".to_string(),
            episodes: vec![],
        };

        write_cassette(&path, &document, false).unwrap();

        assert!(path.exists());
        assert_eq!(read_cassette(&path, false).unwrap(), document);
    }

    #[test]
    fn test_write_compressed_starts_with_gzip_magic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("packed.json.gz");
        let document = CassetteDocument {
            name: "packed".to_string(),
            episodes: vec![],
        };

        write_cassette(&path, &document, true).unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f_u8, 0x8b]);
        assert_eq!(read_cassette(&path, true).unwrap(), document);
    }

    #[test]
    fn test_write_onto_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("occupied.json");
        std::fs::create_dir_all(&path).unwrap();

        let document = CassetteDocument {
            name: "occupied".to_string(),
            episodes: vec![],
        };

        assert!(matches!(
            write_cassette(&path, &document, false),
            Err(ReelError::Storage { .. })
        ));
    }
}
