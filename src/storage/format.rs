//! Cassette document format
//!
//! A cassette file is a pretty-printed JSON document:
//!
//! ```json
//! {
//!   "name": "login_flow",
//!   "episodes": [
//!     {
//!       "request": { "method": "POST", "url": "http://...", "body": "<base64>" },
//!       "response": {
//!         "status": "200 OK",
//!         "status_code": 200,
//!         "content_length": 12,
//!         "headers": { "content-type": ["text/plain"] },
//!         "body": "<base64>"
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! Bodies are standard base64 so that arbitrary bytes survive. Header maps are
//! ordered by name, which keeps re-recorded cassettes diff-friendly.
//!
//! Header values are stored as JSON strings. A value that is not valid UTF-8
//! (e.g. a Latin-1 `obs-text` byte) is recorded with each invalid sequence
//! replaced by U+FFFD, so such values do not replay byte for byte.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::episode::Episode;

/// Cassette file extension
pub const CASSETTE_EXTENSION: &str = "json";

/// Extension appended to compressed cassette files
pub const COMPRESSED_EXTENSION: &str = "gz";

/// On-disk cassette document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CassetteDocument {
    /// Cassette name, informational only
    #[serde(default)]
    pub name: String,
    /// Recorded episodes in call order
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

impl CassetteDocument {
    /// Encode as indented JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');
        Ok(json)
    }

    /// Decode from JSON bytes
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a cassette document
    pub fn from_json(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}

/// Gzip `data` at the fastest compression level
///
/// # Errors
///
/// Returns error if the encoder fails
pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflate gzip `data`
///
/// # Errors
///
/// Returns error if `data` is not a valid gzip stream
pub fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Serde adapter storing `Bytes` as standard base64 text
pub mod base64_body {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as base64
    ///
    /// # Errors
    ///
    /// Propagates serializer errors
    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    /// Deserialize base64 (or `null`, for an absent body) into bytes
    ///
    /// # Errors
    ///
    /// Returns error on invalid base64
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            None => Ok(Bytes::new()),
            Some(text) => STANDARD
                .decode(text.as_bytes())
                .map(Bytes::from)
                .map_err(|e| serde::de::Error::custom(format!("invalid base64 body: {e}"))),
        }
    }
}
