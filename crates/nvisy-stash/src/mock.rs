//! Mock negotiator and transport for testing.
//!
//! Both mocks record how they were used so tests can assert that an upload
//! was (or was not) attempted.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! nvisy-stash = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nvisy_stash::FileStasher;
//! use nvisy_stash::mock::{MockNegotiator, MockTransport};
//!
//! let transport = MockTransport::default();
//! let stasher = FileStasher::new(transport.clone())
//!     .with_negotiator(MockNegotiator::default());
//!
//! let url = stasher.stash_file("hello world", None, None).await?;
//! assert_eq!(transport.call_count(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;

use crate::target::{KEY_FIELD, UploadNegotiator, UploadTarget};
use crate::transport::{
    Headers, HttpTransport, Method, RequestBody, ResponseMode, TransportRequest, TransportResponse,
};
use crate::{Error, Result};

/// Base URL used by [`MockNegotiator::default`].
pub const MOCK_UPLOAD_URL: &str = "https://stash.example.com/";

/// Negotiator that issues a fresh numbered target on every call.
///
/// The n-th call (starting at 1) returns the key `stash/{n}/file`.
#[derive(Debug, Clone)]
pub struct MockNegotiator {
    url: String,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockNegotiator {
    fn default() -> Self {
        Self::new(MOCK_UPLOAD_URL)
    }
}

impl MockNegotiator {
    /// Creates a negotiator issuing targets under `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a negotiator whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of times [`negotiate`](UploadNegotiator::negotiate) was called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl UploadNegotiator for MockNegotiator {
    async fn negotiate(&self) -> Result<UploadTarget> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = &self.failure {
            return Err(Error::negotiation(message.clone()));
        }

        Ok(UploadTarget::new(
            self.url.clone(),
            [
                (KEY_FIELD.to_owned(), format!("stash/{call}/file")),
                ("acl".to_owned(), "private".to_owned()),
            ],
        ))
    }
}

/// A request as seen by [`MockTransport`], with the body fully drained.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request headers.
    pub headers: Headers,
    /// Declared body length, if any.
    pub declared_length: Option<u64>,
    /// Body bytes.
    pub body: Bytes,
    /// Requested response mode.
    pub mode: ResponseMode,
}

impl RecordedRequest {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport that records requests and answers with a canned response.
///
/// Answers `204 No Content` unless configured otherwise.
#[derive(Debug, Clone)]
pub struct MockTransport {
    status: u16,
    body: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new(204, "")
    }
}

impl MockTransport {
    /// Creates a transport answering every request with `status` and `body`.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    /// Snapshot of all requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests().pop()
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let declared_length = request.body.len();
        let body = match request.body {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Bytes(bytes) => bytes,
            RequestBody::Stream { stream, .. } => stream
                .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                    acc.extend_from_slice(&chunk);
                    Ok(acc)
                })
                .await?
                .freeze(),
        };

        let recorded = RecordedRequest {
            url: request.url.to_string(),
            method: request.method,
            headers: request.headers,
            declared_length,
            body,
            mode: request.mode,
        };
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(recorded);
        }

        Ok(TransportResponse::buffered(
            self.status,
            Headers::new(),
            self.body.clone(),
        ))
    }
}
