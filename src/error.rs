//! Error types for Reel

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for Reel operations
pub type Result<T> = std::result::Result<T, ReelError>;

/// Boxed error produced by a real HTTP transport
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in Reel
///
/// Everything except [`ReelError::Network`] means a recording or replay
/// invariant was broken; see [`ReelError::is_fatal`].
#[derive(Debug, Error)]
pub enum ReelError {
    /// API misuse, e.g. starting a session twice
    #[error("usage error: {0}")]
    Usage(String),

    /// Cassette file could not be read, written, or (de)compressed
    #[error("cassette storage failed at {}: {source}", path.display())]
    Storage {
        /// Cassette file path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Cassette file is not a valid cassette document
    #[error("cannot parse cassette {}: {reason}", path.display())]
    Parse {
        /// Cassette file path
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Replay asked for more exchanges than were recorded
    #[error("no more episodes! (request was {method} {url})")]
    MatchExhausted {
        /// Method of the unmatched request
        method: String,
        /// URL of the unmatched request
        url: String,
    },

    /// The live request differs from the next recorded one
    #[error(
        "problem with episode for {method} {url}\n  episode {field} does not match:\n  expected: {expected}\n  but got: {actual}"
    )]
    MatchMismatch {
        /// Name of the first differing field: `Method`, `URL` or `Body`
        field: &'static str,
        /// Recorded value
        expected: String,
        /// Live value
        actual: String,
        /// Method of the live request
        method: String,
        /// URL of the live request
        url: String,
    },

    /// Replay finished with recorded episodes left over
    #[error("cassette '{name}' has {remaining} unplayed episode(s)")]
    UnplayedEpisodes {
        /// Cassette name
        name: String,
        /// Episodes never matched
        remaining: usize,
    },

    /// Recorded response cannot be rebuilt into a live one
    #[error("invalid episode: {0}")]
    InvalidEpisode(String),

    /// Captured body exceeds the configured limit
    #[error("Data too large: {size} bytes exceeds limit of {limit} bytes")]
    DataTooLarge {
        /// Actual size
        size: usize,
        /// Size limit
        limit: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure of the real transport while recording or passing through
    #[error(transparent)]
    Network(BoxError),
}

impl ReelError {
    /// Whether the error ends the session
    ///
    /// Only transport failures are ordinary outcomes of the code under test.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Network(_))
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
