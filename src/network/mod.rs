//! Network layer for Reel
//!
//! [`Transport`] is the single seam through which outbound HTTP flows. Code
//! under test is handed an `Arc<dyn Transport>`; in tests that transport is a
//! [`crate::Vcr`] wrapping the real one.

mod client;

use async_trait::async_trait;

pub use client::HyperTransport;

use crate::episode::{HttpRequest, HttpResponse};
use crate::Result;

/// Idle pooled connections are closed after this many seconds
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Maximum idle pooled connections per host
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Something that can perform an HTTP exchange
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the complete response
    ///
    /// # Errors
    ///
    /// Real transports return [`crate::ReelError::Network`]; a recorder may
    /// also return its own fatal errors
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse>;
}
