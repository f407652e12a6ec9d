//! Transport request types.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use url::Url;

use super::{ByteStream, Headers};

/// HTTP methods the transport must support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

/// How the transport should hand back the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Read the whole body before returning; `content()` holds the decoded text.
    #[default]
    Buffered,
    /// Return as soon as headers arrive; the body stays a byte stream.
    Raw,
}

/// Request body handed to the transport.
#[derive(Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Fully buffered body.
    Bytes(Bytes),
    /// Streamed body, sent with `Content-Length` when the length is known.
    Stream {
        /// Body chunks.
        stream: ByteStream,
        /// Total length of the stream in bytes, if known.
        length: Option<u64>,
    },
}

impl RequestBody {
    /// Returns the body length when it is known up front.
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Empty => Some(0),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::Stream { length, .. } => *length,
        }
    }

    /// Returns true for an empty body.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream { length, .. } => f
                .debug_struct("Stream")
                .field("length", length)
                .finish_non_exhaustive(),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Bytes(Bytes::from(text))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

/// A single HTTP request for a [`HttpTransport`](super::HttpTransport).
#[derive(Debug)]
pub struct TransportRequest {
    /// Target URL.
    pub url: Url,
    /// HTTP method.
    pub method: Method,
    /// Request headers.
    pub headers: Headers,
    /// Request body.
    pub body: RequestBody,
    /// Response handling mode.
    pub mode: ResponseMode,
    /// Optional request timeout (uses the transport default if not set).
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// Creates a bodiless request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            headers: Headers::new(),
            body: RequestBody::Empty,
            mode: ResponseMode::Buffered,
            timeout: None,
        }
    }

    /// Creates a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Creates a POST request.
    pub fn post(url: Url) -> Self {
        Self::new(Method::Post, url)
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds or replaces a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Switches the request to raw (streaming) response mode.
    pub fn raw(mut self) -> Self {
        self.mode = ResponseMode::Raw;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
