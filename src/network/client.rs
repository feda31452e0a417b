//! hyper-based transport for real network calls

use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use super::{Transport, POOL_IDLE_TIMEOUT_SECS, POOL_MAX_IDLE_PER_HOST};
use crate::episode::{HttpRequest, HttpResponse};
use crate::{ReelError, Result};

/// Pooled HTTP/1.1 client performing real requests
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    /// Create a new HTTP client
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build_http();

        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("Sending {} {}", request.method(), request.uri());

        let (parts, body) = request.into_parts();
        let http_request = hyper::Request::from_parts(parts, Full::new(body));

        let response = self.client.request(http_request).await.map_err(|e| {
            warn!("Request failed: {e}");
            ReelError::Network(Box::new(e))
        })?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| {
                warn!("Failed to read response body: {e}");
                ReelError::Network(Box::new(e))
            })?
            .to_bytes();

        Ok(Response::from_parts(parts, body))
    }
}
