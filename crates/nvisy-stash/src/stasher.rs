//! The stash entry point.

use std::sync::Arc;

use url::Url;

use crate::form::UploadForm;
use crate::input::{StashInput, normalize};
use crate::outcome::classify;
use crate::target::{SharedNegotiator, UploadNegotiator};
use crate::transport::{HttpTransport, SharedTransport, TransportRequest};
use crate::{Error, Result, StashConfig};

/// Tracing target for stash operations.
pub const TRACING_TARGET: &str = "nvisy_stash::stasher";

/// Uploads file content to one-time upload targets and returns retrieval URLs.
///
/// Cheap to clone; clones share the transport and negotiator. Concurrent
/// calls share no mutable state, and every call negotiates its own target.
///
/// # Examples
///
/// ```rust,ignore
/// use nvisy_reqwest::{ReqwestClient, RpcNegotiator};
/// use nvisy_stash::FileStasher;
///
/// let client = ReqwestClient::default();
/// let negotiator = RpcNegotiator::new(client.clone(), rpc_url);
/// let stasher = FileStasher::new(client).with_negotiator(negotiator);
///
/// let url = stasher.stash_file("hello world", None, Some("hello.txt")).await?;
/// ```
#[derive(Clone)]
pub struct FileStasher {
    transport: SharedTransport,
    negotiator: Option<SharedNegotiator>,
    config: StashConfig,
}

impl std::fmt::Debug for FileStasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStasher")
            .field("config", &self.config)
            .field("has_negotiator", &self.negotiator.is_some())
            .finish_non_exhaustive()
    }
}

impl FileStasher {
    /// Creates a stasher without a negotiator and with the default configuration.
    pub fn new(transport: impl HttpTransport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            negotiator: None,
            config: StashConfig::default(),
        }
    }

    /// Sets the negotiator that issues upload targets.
    #[must_use]
    pub fn with_negotiator(mut self, negotiator: impl UploadNegotiator + 'static) -> Self {
        self.negotiator = Some(Arc::new(negotiator));
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: StashConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    /// Uploads `content` and returns the URL it can be retrieved from.
    ///
    /// `known_length` and `filename` override whatever the content itself
    /// reports. Streams without either a `known_length` or a usable
    /// `content-length` header are rejected with [`Error::LengthRequired`]
    /// before the upload starts.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if no negotiator was set
    /// - [`Error::Negotiation`] if no usable upload target could be obtained
    /// - [`Error::UnrecognizedInput`] if a pending input settles to an unsupported shape
    /// - [`Error::TooLarge`] if the known length exceeds the configured ceiling
    /// - [`Error::LengthRequired`] if the length is unknown or the store rejects it
    /// - [`Error::UploadFailed`] for any other store-side failure
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET,
        fields(known_length = ?known_length, has_filename = filename.is_some())
    )]
    pub async fn stash_file(
        &self,
        content: impl Into<StashInput>,
        known_length: Option<u64>,
        filename: Option<&str>,
    ) -> Result<String> {
        let result = self.stash(content.into(), known_length, filename).await;

        match &result {
            Ok(url) => {
                let host = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_owned));
                tracing::info!(
                    target: TRACING_TARGET,
                    host = host.as_deref().unwrap_or_default(),
                    "File stashed"
                );
            }
            Err(error) => tracing::warn!(
                target: TRACING_TARGET,
                kind = %error.kind(),
                error = %error,
                "Failed to stash file"
            ),
        }

        result
    }

    async fn stash(
        &self,
        content: StashInput,
        known_length: Option<u64>,
        filename: Option<&str>,
    ) -> Result<String> {
        let negotiator = self
            .negotiator
            .as_ref()
            .ok_or_else(|| Error::configuration("no upload negotiator is available"))?;

        let target = negotiator.negotiate().await?;
        target.validate()?;
        let url = Url::parse(&target.url).map_err(|e| {
            Error::negotiation(format!("upload target has an invalid url: {e}")).with_source(e)
        })?;

        tracing::debug!(
            target: TRACING_TARGET,
            fields = target.fields.len(),
            "Negotiated upload target"
        );

        let input = normalize(
            content,
            known_length,
            filename.map(str::to_owned),
            self.config.effective_default_filename(),
        )
        .await?;

        let form = UploadForm::for_target(&target, input, &self.config)?;
        let content_type = form.content_type();
        let body = form.into_body()?;

        tracing::debug!(
            target: TRACING_TARGET,
            content_length = body.len(),
            "Uploading form"
        );

        let request = TransportRequest::post(url)
            .with_header("Content-Type", content_type)
            .with_body(body);
        let response = self.transport.send(request).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            status = response.status(),
            "Store responded"
        );

        classify(&response, &target)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::ErrorKind;
    use crate::mock::{MOCK_UPLOAD_URL, MockNegotiator, MockTransport};
    use crate::outcome::STORE_LENGTH_COMPLAINT;
    use crate::transport::{ByteStream, Headers, Method, TransportResponse};

    fn stasher(transport: &MockTransport, negotiator: &MockNegotiator) -> FileStasher {
        FileStasher::new(transport.clone()).with_negotiator(negotiator.clone())
    }

    fn stream_of(text: &'static str) -> ByteStream {
        Box::pin(futures::stream::once(async move {
            Ok::<_, std::io::Error>(Bytes::from_static(text.as_bytes()))
        }))
    }

    #[tokio::test]
    async fn test_text_upload_returns_retrieval_url() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();

        let url = stasher(&transport, &negotiator)
            .stash_file("hello world", None, None)
            .await
            .unwrap();
        assert_eq!(url, format!("{MOCK_UPLOAD_URL}stash/1/file"));

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, MOCK_UPLOAD_URL);
        assert_eq!(request.declared_length, Some(request.body.len() as u64));

        let content_type = request.headers.get("content-type").unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));

        let body = request.body_text();
        let key = body.find("name=\"key\"").unwrap();
        let acl = body.find("name=\"acl\"").unwrap();
        let disposition = body.find("name=\"Content-Disposition\"").unwrap();
        let file = body.find("name=\"file\"; filename=\"unnamedfile\"").unwrap();
        assert!(key < acl && acl < disposition && disposition < file);
        assert!(body.contains("Content-Type: binary/octet-stream\r\n\r\nhello world\r\n"));
    }

    #[tokio::test]
    async fn test_known_length_above_ceiling_is_rejected() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();

        let error = stasher(&transport, &negotiator)
            .stash_file("tiny", Some(150_000_001), None)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::TooLarge);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_header_length_above_ceiling_is_rejected() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();
        let download = TransportResponse::raw(
            200,
            Headers::new().with("content-length", "150000001"),
            stream_of("never read"),
        );

        let error = stasher(&transport, &negotiator)
            .stash_file(download, None, None)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            Error::TooLarge {
                length: 150_000_001,
                max: 150_000_000
            }
        ));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_caller_length_wins_for_text() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();

        stasher(&transport, &negotiator)
            .stash_file("hello world", Some(20), None)
            .await
            .unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.declared_length, Some(request.body.len() as u64 + 9));
    }

    #[tokio::test]
    async fn test_overflowing_length_is_too_large() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();
        let stasher = stasher(&transport, &negotiator)
            .with_config(StashConfig::default().with_max_upload_size(u64::MAX));

        let error = stasher
            .stash_file(stream_of("huge"), Some(u64::MAX), None)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::TooLarge);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_content_type_with_line_break_is_rejected() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();
        let config = StashConfig::default().with_content_type("text/plain\r\nX-Injected: 1");

        let error = stasher(&transport, &negotiator)
            .with_config(config)
            .stash_file("hello", None, None)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ceiling_comes_from_config() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();
        let stasher = stasher(&transport, &negotiator)
            .with_config(StashConfig::default().with_max_upload_size(5));

        let error = stasher.stash_file("hello world", None, None).await.unwrap_err();
        assert!(matches!(error, Error::TooLarge { length: 11, max: 5 }));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_without_length_is_rejected_before_upload() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();

        let error = stasher(&transport, &negotiator)
            .stash_file(stream_of("unknown length"), None, Some("data.bin"))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::LengthRequired));
        assert!(error.to_string().contains("knownLength"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_with_known_length_is_uploaded() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();

        stasher(&transport, &negotiator)
            .stash_file(stream_of("streamed"), Some(8), Some("data.bin"))
            .await
            .unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.declared_length, Some(request.body.len() as u64));
        assert!(request.body_text().contains("filename=\"data.bin\""));
    }

    #[tokio::test]
    async fn test_response_like_provides_length_and_filename() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();
        let headers = Headers::new()
            .with("content-length", "37")
            .with("content-disposition", "attachment; filename=\"notes.txt\"");
        let download = TransportResponse::raw(
            200,
            headers,
            stream_of("thirty-seven bytes of meeting notes.."),
        );

        stasher(&transport, &negotiator)
            .stash_file(download, None, None)
            .await
            .unwrap();

        let request = transport.last_request().unwrap();
        let body = request.body_text();
        assert!(body.contains("attachment; filename=\"notes.txt\""));
        assert!(body.contains("name=\"file\"; filename=\"notes.txt\""));
        assert!(body.contains("\r\n\r\nthirty-seven bytes of meeting notes..\r\n--"));
        assert_eq!(request.declared_length, Some(request.body.len() as u64));
    }

    #[tokio::test]
    async fn test_quoted_filename_never_breaks_disposition() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();

        stasher(&transport, &negotiator)
            .stash_file("x", None, Some("my \"quoted\" file.txt"))
            .await
            .unwrap();

        let body = transport.last_request().unwrap().body_text();
        assert!(body.contains(
            "name=\"Content-Disposition\"\r\n\r\nattachment; filename=\"my quoted file.txt\"\r\n"
        ));
    }

    #[tokio::test]
    async fn test_each_stash_negotiates_its_own_target() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();
        let stasher = stasher(&transport, &negotiator);

        let first = stasher.stash_file("same", None, None).await.unwrap();
        let second = stasher.stash_file("same", None, None).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(negotiator.call_count(), 2);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_pending_unrecognized_never_uploads() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();
        let pending = StashInput::pending(async { Ok(Bytes::from_static(b"opaque")) });

        let error = stasher(&transport, &negotiator)
            .stash_file(pending, None, None)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnrecognizedInput);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_text_is_uploaded() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();
        let pending = StashInput::pending(async { Ok("settled later") });

        let url = stasher(&transport, &negotiator)
            .stash_file(pending, None, Some("later.txt"))
            .await
            .unwrap();

        assert!(url.ends_with("stash/1/file"));
        assert!(transport.last_request().unwrap().body_text().contains("settled later"));
    }

    #[tokio::test]
    async fn test_missing_negotiator_is_configuration_error() {
        let transport = MockTransport::default();
        let stasher = FileStasher::new(transport.clone());

        let error = stasher.stash_file("hello", None, None).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_negotiation_failure_propagates() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::failing("rpc unavailable");

        let error = stasher(&transport, &negotiator)
            .stash_file("hello", None, None)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Negotiation);
        assert_eq!(negotiator.call_count(), 1);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_target_url_is_negotiation_error() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::new("not a url");

        let error = stasher(&transport, &negotiator)
            .stash_file("hello", None, None)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Negotiation);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_store_length_complaint_is_length_required() {
        let transport = MockTransport::new(411, format!("<Message>{STORE_LENGTH_COMPLAINT}</Message>"));
        let negotiator = MockNegotiator::default();

        let error = stasher(&transport, &negotiator)
            .stash_file("hello", None, None)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::LengthRequired));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_store_rejection_is_upload_failure() {
        let transport = MockTransport::new(403, "AccessDenied");
        let negotiator = MockNegotiator::default();

        let error = stasher(&transport, &negotiator)
            .stash_file("hello", None, None)
            .await
            .unwrap_err();

        assert!(matches!(
            &error,
            Error::UploadFailed { status: 403, body } if body == "AccessDenied"
        ));
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn test_custom_content_type_and_default_filename() {
        let transport = MockTransport::default();
        let negotiator = MockNegotiator::default();
        let config = StashConfig::default()
            .with_content_type("application/pdf")
            .with_default_filename("upload.pdf");

        stasher(&transport, &negotiator)
            .with_config(config)
            .stash_file(vec![0x25u8, 0x50, 0x44, 0x46], None, None)
            .await
            .unwrap();

        let body = transport.last_request().unwrap().body_text();
        assert!(body.contains("filename=\"upload.pdf\"\r\nContent-Type: application/pdf\r\n"));
    }
}
