//! Session controller: the transport every outbound request goes through
//!
//! A [`Vcr`] wraps the real transport. While stopped it passes requests
//! straight through. [`Vcr::start`] picks recording or replay depending on
//! whether the cassette already exists, and [`Vcr::stop`] persists a
//! recording.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{LimitsConfig, Mode, VcrConfig};
use crate::episode::{Episode, HttpRequest, HttpResponse, RequestSnapshot, ResponseSnapshot};
use crate::filter::Filters;
use crate::matcher::{EpisodeMatcher, SequentialMatcher};
use crate::network::Transport;
use crate::storage::Cassette;
use crate::{ReelError, Result};

/// Hook run on every request before it is recorded or matched
///
/// Receives the current mode and may rewrite the request, e.g. with
/// [`crate::episode::modify_request_body`].
pub type RequestHook = Arc<dyn Fn(Mode, &mut HttpRequest) + Send + Sync>;

/// What a session did, reported by [`Vcr::stop`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Cassette bound to the session, if one was started
    pub cassette: Option<String>,
    /// Mode the session was in when stopped
    pub mode: Mode,
    /// Episodes recorded (recording) or loaded (replay)
    pub episodes: usize,
    /// Episodes served from the cassette
    pub played: usize,
    /// Episodes loaded but never served
    pub unplayed: usize,
}

struct Session {
    mode: Mode,
    /// Bumped on every start, so late recordings can tell sessions apart
    generation: u64,
    cassette: Option<Cassette>,
    matcher: Box<dyn EpisodeMatcher>,
    filters: Arc<Filters>,
    hook: Option<RequestHook>,
}

impl Session {
    fn replay(&mut self, mut request: HttpRequest, limits: &LimitsConfig) -> Result<HttpResponse> {
        if let Some(hook) = &self.hook {
            hook(Mode::Replaying, &mut request);
        }

        let snapshot = RequestSnapshot::capture(&request, &self.filters, limits)?;
        let episode = self.matcher.match_episode(&snapshot).map_err(|e| {
            error!("Replay diverged from cassette: {e}");
            e
        })?;

        debug!(
            "Replayed {} {} -> {}",
            snapshot.method, snapshot.url, episode.response.status_code
        );
        episode.response.materialize()
    }
}

/// HTTP recorder/player
pub struct Vcr {
    inner: Arc<dyn Transport>,
    config: VcrConfig,
    session: Mutex<Session>,
}

impl Vcr {
    /// Create a stopped recorder around the real transport
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(inner: Arc<dyn Transport>, config: VcrConfig) -> Result<Self> {
        config.validate()?;
        let filters = Filters::from_rules(&config.filters)?;

        Ok(Self {
            inner,
            config,
            session: Mutex::new(Session {
                mode: Mode::Stopped,
                generation: 0,
                cassette: None,
                matcher: Box::new(SequentialMatcher::new()),
                filters: Arc::new(filters),
                hook: None,
            }),
        })
    }

    /// Replace the default positional matcher
    #[must_use]
    pub fn with_matcher(mut self, matcher: Box<dyn EpisodeMatcher>) -> Self {
        self.session.get_mut().matcher = matcher;
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &VcrConfig {
        &self.config
    }

    /// Start a session on cassette `name`
    ///
    /// Replays if the cassette file exists, records otherwise.
    ///
    /// # Errors
    ///
    /// Returns a usage error if a session is already running or the name is
    /// invalid, and a storage or parse error if an existing cassette cannot
    /// be loaded
    pub async fn start(&self, name: &str) -> Result<Mode> {
        let mut session = self.session.lock().await;
        if session.mode != Mode::Stopped {
            return Err(ReelError::Usage("session already started!".to_string()));
        }

        let mut cassette = Cassette::new(name, &self.config.fixtures_dir, self.config.compress)?;
        if cassette.exists() {
            cassette.load()?;
            session.matcher.load(cassette.take_episodes());
            session.mode = Mode::Replaying;
        } else {
            session.mode = Mode::Recording;
        }

        info!(
            "Started session on cassette '{}' ({:?})",
            cassette.name(),
            session.mode
        );
        session.cassette = Some(cassette);
        session.generation += 1;
        Ok(session.mode)
    }

    /// Stop the session, persisting the cassette if it was recording
    ///
    /// Legal in any mode; the recorder is always stopped afterwards.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the recording cannot be written, or
    /// `UnplayedEpisodes` when `require_all_played` is set and the replay
    /// left episodes unused
    pub async fn stop(&self) -> Result<SessionSummary> {
        let mut session = self.session.lock().await;
        let mode = std::mem::replace(&mut session.mode, Mode::Stopped);
        let cassette = session.cassette.take();

        let summary = SessionSummary {
            cassette: cassette.as_ref().map(|c| c.name().to_string()),
            mode,
            episodes: match mode {
                Mode::Recording => cassette.as_ref().map_or(0, Cassette::len),
                Mode::Replaying => session.matcher.played() + session.matcher.remaining(),
                Mode::Stopped => 0,
            },
            played: if mode.is_replaying() {
                session.matcher.played()
            } else {
                0
            },
            unplayed: if mode.is_replaying() {
                session.matcher.remaining()
            } else {
                0
            },
        };
        session.matcher.load(Vec::new());
        drop(session);

        if let Some(cassette) = cassette.as_ref().filter(|_| mode.is_recording()) {
            cassette.save()?;
        }

        if mode.is_replaying() && self.config.require_all_played && summary.unplayed > 0 {
            return Err(ReelError::UnplayedEpisodes {
                name: summary.cassette.clone().unwrap_or_default(),
                remaining: summary.unplayed,
            });
        }

        if mode != Mode::Stopped {
            info!("Stopped session: {:?}", summary);
        }
        Ok(summary)
    }

    /// Current mode
    pub async fn current_mode(&self) -> Mode {
        self.session.lock().await.mode
    }

    /// Replace `plain` with `replacement` in every captured request body
    ///
    /// Filters apply in the order they were first set.
    ///
    /// # Errors
    ///
    /// Returns error if the filter cannot be compiled
    pub async fn set_filter(&self, plain: &str, replacement: &str) -> Result<()> {
        let mut session = self.session.lock().await;
        Arc::make_mut(&mut session.filters).set(plain, replacement)
    }

    /// Install the hook run on each request while a session is active
    pub async fn set_request_hook<F>(&self, hook: F)
    where
        F: Fn(Mode, &mut HttpRequest) + Send + Sync + 'static,
    {
        self.session.lock().await.hook = Some(Arc::new(hook));
    }

    /// Remove the request hook
    pub async fn clear_request_hook(&self) {
        self.session.lock().await.hook = None;
    }

    /// Route one outbound request according to the current mode
    ///
    /// # Errors
    ///
    /// Returns the real transport's error untouched (`Network`), or a fatal
    /// error when recording or replay cannot proceed
    pub async fn intercept(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut session = self.session.lock().await;
        let mode = session.mode;
        match mode {
            Mode::Stopped => {
                drop(session);
                self.inner.perform(request).await
            }
            Mode::Replaying => session.replay(request, &self.config.limits),
            Mode::Recording => {
                let generation = session.generation;
                let hook = session.hook.clone();
                let filters = Arc::clone(&session.filters);
                drop(session);
                self.record(request, generation, hook, &filters).await
            }
        }
    }

    async fn record(
        &self,
        mut request: HttpRequest,
        generation: u64,
        hook: Option<RequestHook>,
        filters: &Filters,
    ) -> Result<HttpResponse> {
        if let Some(hook) = hook {
            hook(Mode::Recording, &mut request);
        }

        let limits = &self.config.limits;
        let request_snapshot = RequestSnapshot::capture(&request, filters, limits)?;

        let response = self.inner.perform(request).await?;
        let response_snapshot = ResponseSnapshot::capture(response, limits)?;
        let live = response_snapshot.materialize()?;

        let mut session = self.session.lock().await;
        let same_session = session.mode.is_recording() && session.generation == generation;
        match session.cassette.as_mut().filter(|_| same_session) {
            Some(cassette) => {
                debug!(
                    "Recorded {} {} -> {} (episode {})",
                    request_snapshot.method,
                    request_snapshot.url,
                    response_snapshot.status_code,
                    cassette.len() + 1
                );
                cassette.push(Episode {
                    request: request_snapshot,
                    response: response_snapshot,
                });
            }
            None => warn!(
                "Session ended during {} {}; episode discarded",
                request_snapshot.method, request_snapshot.url
            ),
        }

        Ok(live)
    }
}

#[async_trait]
impl Transport for Vcr {
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.intercept(request).await
    }
}
