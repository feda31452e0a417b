//! Episode matching for replay
//!
//! The default strategy is strictly positional: the n-th live request must
//! equal the n-th recorded one. Under concurrent callers the order is the
//! order in which requests reach the matcher, not the order they were issued.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::episode::{Episode, RequestSnapshot};
use crate::{ReelError, Result};

/// Strategy pairing live requests with recorded episodes
pub trait EpisodeMatcher: Send {
    /// Reset the matcher to serve `episodes`
    fn load(&mut self, episodes: Vec<Episode>);

    /// Find the episode answering `request`
    ///
    /// # Errors
    ///
    /// Returns `MatchExhausted` or `MatchMismatch` when no episode fits
    fn match_episode(&mut self, request: &RequestSnapshot) -> Result<Episode>;

    /// Episodes not yet served
    fn remaining(&self) -> usize;

    /// Episodes served so far
    fn played(&self) -> usize;
}

/// Positional matcher over an immutable episode list
#[derive(Debug, Clone)]
pub struct SequentialMatcher {
    episodes: Arc<[Episode]>,
    cursor: usize,
}

impl Default for SequentialMatcher {
    fn default() -> Self {
        Self {
            episodes: Arc::from(Vec::new()),
            cursor: 0,
        }
    }
}

impl SequentialMatcher {
    /// Create an empty matcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The episode the next request must match, if any
    #[must_use]
    pub fn peek(&self) -> Option<&Episode> {
        self.episodes.get(self.cursor)
    }
}

impl EpisodeMatcher for SequentialMatcher {
    fn load(&mut self, episodes: Vec<Episode>) {
        self.episodes = episodes.into();
        self.cursor = 0;
    }

    fn match_episode(&mut self, request: &RequestSnapshot) -> Result<Episode> {
        let Some(episode) = self.episodes.get(self.cursor) else {
            warn!("No episode left for {} {}", request.method, request.url);
            return Err(ReelError::MatchExhausted {
                method: request.method.clone(),
                url: request.url.clone(),
            });
        };

        let expected = &episode.request;
        if expected.method != request.method {
            return Err(mismatch(request, "Method", &expected.method, &request.method));
        }

        if expected.url != request.url {
            return Err(mismatch(request, "URL", &expected.url, &request.url));
        }

        if expected.body != request.body {
            return Err(mismatch(
                request,
                "Body",
                &String::from_utf8_lossy(&expected.body),
                &String::from_utf8_lossy(&request.body),
            ));
        }

        self.cursor += 1;
        debug!(
            "Matched episode {}/{}: {} {}",
            self.cursor,
            self.episodes.len(),
            request.method,
            request.url
        );

        Ok(episode.clone())
    }

    fn remaining(&self) -> usize {
        self.episodes.len() - self.cursor
    }

    fn played(&self) -> usize {
        self.cursor
    }
}

fn mismatch(
    request: &RequestSnapshot,
    field: &'static str,
    expected: &str,
    actual: &str,
) -> ReelError {
    warn!(
        "Episode {} mismatch for {} {}",
        field, request.method, request.url
    );
    ReelError::MatchMismatch {
        field,
        expected: expected.to_string(),
        actual: actual.to_string(),
        method: request.method.clone(),
        url: request.url.clone(),
    }
}
