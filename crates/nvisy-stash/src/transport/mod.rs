//! HTTP transport boundary.
//!
//! The stash pipeline never talks to the network directly. It hands a
//! [`TransportRequest`] to an [`HttpTransport`] and interprets the
//! [`TransportResponse`] it gets back. `nvisy-reqwest` provides the
//! production implementation; [`crate::mock`] provides a recording one.

mod headers;
mod request;
mod response;

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;

pub use headers::Headers;
pub use request::{Method, RequestBody, ResponseMode, TransportRequest};
pub use response::TransportResponse;

use crate::Result;

/// Boxed stream of body chunks.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Shared transport handle.
pub type SharedTransport = Arc<dyn HttpTransport>;

/// Performs HTTP requests on behalf of the stash pipeline.
///
/// Implementations must be safe to share between concurrent stash calls.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and returns the normalized response.
    ///
    /// A non-2xx status is not an error at this layer; only failures to
    /// obtain a response at all (connection, timeout, body stream) are.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

#[async_trait::async_trait]
impl<T> HttpTransport for Arc<T>
where
    T: HttpTransport + ?Sized,
{
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.as_ref().send(request).await
    }
}
