//! Episodes: immutable snapshots of one request/response exchange

use std::collections::BTreeMap;

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use hyper::{Request, Response, StatusCode, Version};
use serde::{Deserialize, Serialize};

use crate::config::LimitsConfig;
use crate::filter::Filters;
use crate::storage::format::base64_body;
use crate::{ReelError, Result};

/// Live request passing through the recorder
pub type HttpRequest = Request<Bytes>;

/// Live response handed back to callers
pub type HttpResponse = Response<Bytes>;

/// Recorded status text, attached to replayed responses as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine(pub String);

/// Recorded request
///
/// Headers are deliberately absent: two requests that differ only in headers
/// record and match identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// HTTP method
    pub method: String,
    /// Full request URL
    pub url: String,
    /// Body after filtering
    #[serde(with = "base64_body")]
    pub body: Bytes,
}

impl RequestSnapshot {
    /// Snapshot a live request, applying `filters` to the body
    ///
    /// The request itself is left untouched and can still be sent.
    ///
    /// # Errors
    ///
    /// Returns error if the body exceeds `limits.max_request_size`
    pub fn capture(
        request: &HttpRequest,
        filters: &Filters,
        limits: &LimitsConfig,
    ) -> Result<Self> {
        let body = request.body();
        if body.len() > limits.max_request_size {
            return Err(ReelError::DataTooLarge {
                size: body.len(),
                limit: limits.max_request_size,
            });
        }

        Ok(Self {
            method: request.method().as_str().to_string(),
            url: request.uri().to_string(),
            body: filters.apply(body),
        })
    }
}

/// Recorded response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// Status line text, e.g. `200 OK`
    pub status: String,
    /// Numeric status code
    pub status_code: u16,
    /// Declared body length, if the response declared one
    pub content_length: Option<u64>,
    /// Header values by name, in received order per name
    pub headers: BTreeMap<String, Vec<String>>,
    /// Response body
    #[serde(with = "base64_body")]
    pub body: Bytes,
}

impl ResponseSnapshot {
    /// Snapshot a live response, consuming it
    ///
    /// # Errors
    ///
    /// Returns error if the body exceeds `limits.max_response_size`
    pub fn capture(response: HttpResponse, limits: &LimitsConfig) -> Result<Self> {
        let (parts, body) = response.into_parts();
        if body.len() > limits.max_response_size {
            return Err(ReelError::DataTooLarge {
                size: body.len(),
                limit: limits.max_response_size,
            });
        }

        let status = parts
            .extensions
            .get::<StatusLine>()
            .map_or_else(|| status_text(parts.status), |line| line.0.clone());

        let content_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in &parts.headers {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        Ok(Self {
            status,
            status_code: parts.status.as_u16(),
            content_length,
            headers,
            body,
        })
    }

    /// Check that the snapshot can be turned back into a response
    ///
    /// # Errors
    ///
    /// Returns error naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        StatusCode::from_u16(self.status_code)
            .map_err(|_| ReelError::InvalidEpisode(format!("status code {}", self.status_code)))?;

        for (name, values) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ReelError::InvalidEpisode(format!("header name '{name}'")))?;
            for value in values {
                HeaderValue::from_str(value).map_err(|_| {
                    ReelError::InvalidEpisode(format!("value of header '{name}'"))
                })?;
            }
        }

        Ok(())
    }

    /// Build a fresh live response from the snapshot
    ///
    /// The protocol version is always HTTP/1.0, whatever was recorded.
    ///
    /// # Errors
    ///
    /// Returns error if the snapshot holds an invalid status or header
    pub fn materialize(&self) -> Result<HttpResponse> {
        let mut builder = Response::builder()
            .status(self.status_code)
            .version(Version::HTTP_10)
            .extension(StatusLine(self.status.clone()));

        for (name, values) in &self.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        if let Some(length) = self.content_length {
            if !self.headers.keys().any(|n| n.eq_ignore_ascii_case("content-length")) {
                builder = builder.header(CONTENT_LENGTH, length);
            }
        }

        builder
            .body(self.body.clone())
            .map_err(|e| ReelError::InvalidEpisode(e.to_string()))
    }
}

/// One completed exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// What was sent
    pub request: RequestSnapshot,
    /// What came back
    pub response: ResponseSnapshot,
}

/// Rewrite a request body in place, keeping `Content-Length` in sync
///
/// Requests without a body are left alone. Meant for use inside a request
/// hook, e.g. to normalize a volatile field before it is recorded.
pub fn modify_request_body<F>(request: &mut HttpRequest, modify: F)
where
    F: FnOnce(&str) -> String,
{
    if request.body().is_empty() {
        return;
    }

    let modified = modify(&String::from_utf8_lossy(request.body()));
    request
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(modified.len()));
    *request.body_mut() = Bytes::from(modified);
}

fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(url: &str, body: &'static [u8]) -> HttpRequest {
        Request::builder()
            .method("POST")
            .uri(url)
            .header("content-type", "text/plain")
            .body(Bytes::from_static(body))
            .unwrap()
    }

    #[test]
    fn test_capture_request_applies_filters() {
        let mut filters = Filters::new();
        filters.set("secret-key", "dummy-key").unwrap();

        let request = post("http://localhost:8080/login", b"secret-key");
        let snapshot =
            RequestSnapshot::capture(&request, &filters, &LimitsConfig::default()).unwrap();

        assert_eq!(snapshot.method, "POST");
        assert_eq!(snapshot.url, "http://localhost:8080/login");
        assert_eq!(&snapshot.body[..], b"dummy-key");

        // The live request still carries the original body
        assert_eq!(&request.body()[..], b"secret-key");
    }

    #[test]
    fn test_capture_request_ignores_headers() {
        let a = post("http://localhost/", b"x");
        let mut b = post("http://localhost/", b"x");
        b.headers_mut()
            .insert("authorization", HeaderValue::from_static("Bearer abc"));

        let filters = Filters::new();
        let limits = LimitsConfig::default();
        assert_eq!(
            RequestSnapshot::capture(&a, &filters, &limits).unwrap(),
            RequestSnapshot::capture(&b, &filters, &limits).unwrap()
        );
    }

    #[test]
    fn test_capture_request_too_large() {
        let limits = LimitsConfig {
            max_request_size: 4,
            ..LimitsConfig::default()
        };
        let request = post("http://localhost/", b"too long");

        let err = RequestSnapshot::capture(&request, &Filters::new(), &limits).unwrap_err();
        assert!(matches!(err, ReelError::DataTooLarge { size: 8, limit: 4 }));
    }

    #[test]
    fn test_capture_response() {
        let response = Response::builder()
            .status(201)
            .version(Version::HTTP_11)
            .header("set-cookie", "a=1")
            .header("set-cookie", "b=2")
            .header("content-length", "5")
            .body(Bytes::from_static(b"hello"))
            .unwrap();

        let snapshot = ResponseSnapshot::capture(response, &LimitsConfig::default()).unwrap();

        assert_eq!(snapshot.status, "201 Created");
        assert_eq!(snapshot.status_code, 201);
        assert_eq!(snapshot.content_length, Some(5));
        assert_eq!(snapshot.headers["set-cookie"], vec!["a=1", "b=2"]);
        assert_eq!(&snapshot.body[..], b"hello");
    }

    #[test]
    fn test_capture_response_non_utf8_header_value() {
        let response = Response::builder()
            .status(200)
            .header("x-latin1", HeaderValue::from_bytes(b"caf\xe9").unwrap())
            .header("x-utf8", "café")
            .body(Bytes::new())
            .unwrap();

        let snapshot = ResponseSnapshot::capture(response, &LimitsConfig::default()).unwrap();

        assert_eq!(snapshot.headers["x-latin1"], vec!["caf\u{fffd}"]);
        assert_eq!(snapshot.headers["x-utf8"], vec!["café"]);

        let replayed = snapshot.materialize().unwrap();
        assert_eq!(replayed.headers()["x-utf8"].as_bytes(), "café".as_bytes());
    }

    #[test]
    fn test_materialize_forces_http_10() {
        let response = Response::builder()
            .status(200)
            .version(Version::HTTP_2)
            .header("test", "yes")
            .body(Bytes::from_static(b"ok"))
            .unwrap();
        let snapshot = ResponseSnapshot::capture(response, &LimitsConfig::default()).unwrap();

        let replayed = snapshot.materialize().unwrap();

        assert_eq!(replayed.version(), Version::HTTP_10);
        assert_eq!(replayed.status(), StatusCode::OK);
        assert_eq!(replayed.headers()["test"], "yes");
        assert_eq!(
            replayed.extensions().get::<StatusLine>(),
            Some(&StatusLine("200 OK".to_string()))
        );
        assert_eq!(&replayed.body()[..], b"ok");
    }

    #[test]
    fn test_materialize_restores_declared_length() {
        let snapshot = ResponseSnapshot {
            status: "200 OK".to_string(),
            status_code: 200,
            content_length: Some(2),
            headers: BTreeMap::new(),
            body: Bytes::from_static(b"ok"),
        };

        let replayed = snapshot.materialize().unwrap();
        assert_eq!(replayed.headers()[CONTENT_LENGTH], "2");
    }

    #[test]
    fn test_materialize_twice_gives_fresh_bodies() {
        let snapshot = ResponseSnapshot {
            status: "200 OK".to_string(),
            status_code: 200,
            content_length: None,
            headers: BTreeMap::new(),
            body: Bytes::from_static(b"abc\ndef\n"),
        };

        let first = snapshot.materialize().unwrap();
        let second = snapshot.materialize().unwrap();
        assert_eq!(first.body(), second.body());
    }

    #[test]
    fn test_validate_rejects_bad_status() {
        let snapshot = ResponseSnapshot {
            status: "42".to_string(),
            status_code: 42,
            content_length: None,
            headers: BTreeMap::new(),
            body: Bytes::new(),
        };

        assert!(matches!(snapshot.validate(), Err(ReelError::InvalidEpisode(_))));
        assert!(snapshot.materialize().is_err());
    }

    #[test]
    fn test_modify_request_body() {
        let mut request = post("http://localhost/", b"abc");
        request
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(3usize));

        modify_request_body(&mut request, |input| {
            assert_eq!(input, "abc");
            "foofoo".to_string()
        });

        assert_eq!(request.headers()[CONTENT_LENGTH], "6");
        assert_eq!(&request.body()[..], b"foofoo");
    }

    #[test]
    fn test_modify_request_body_without_body() {
        let mut request = Request::builder()
            .uri("http://localhost/")
            .body(Bytes::new())
            .unwrap();

        modify_request_body(&mut request, |_| "foofoo".to_string());

        assert!(request.body().is_empty());
        assert!(request.headers().get(CONTENT_LENGTH).is_none());
    }
}
