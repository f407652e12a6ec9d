//! Reduction of any [`StashInput`] to encodable content plus hints.

use std::fmt;

use bytes::Bytes;

use super::{StashInput, TRACING_TARGET, parse_filename, sanitize_filename};
use crate::transport::ByteStream;
use crate::{Error, Result};

/// Content ready to be placed in the `file` part.
pub enum FileContent {
    /// In-memory content; its length is always known.
    Bytes(Bytes),
    /// Streamed content; its length is only known through hints.
    Stream(ByteStream),
}

impl FileContent {
    /// Length the content reports by itself.
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::Stream(_) => None,
        }
    }

    /// Returns true for empty in-memory content.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Output of [`normalize`].
#[derive(Debug)]
pub struct NormalizedInput {
    /// Content to upload.
    pub content: FileContent,
    /// Caller-supplied or header-derived length.
    ///
    /// In-memory content falls back to its own length when this is `None`.
    pub known_length: Option<u64>,
    /// Sanitized filename.
    pub filename: String,
}

impl NormalizedInput {
    /// Best length available before encoding: the hint, else the content's own.
    pub fn effective_length(&self) -> Option<u64> {
        self.known_length.or_else(|| self.content.len())
    }
}

/// Settles and classifies `input`, deriving length and filename hints.
///
/// Caller-supplied `known_length` and `filename` always win over values
/// derived from response headers. A pending input is awaited once and must
/// settle to text or a response; anything else is rejected with
/// [`Error::UnrecognizedInput`]. No network I/O happens here beyond what the
/// pending value itself does.
pub async fn normalize(
    input: StashInput,
    known_length: Option<u64>,
    filename: Option<String>,
    default_filename: &str,
) -> Result<NormalizedInput> {
    let (settled, was_pending) = match input {
        StashInput::Pending(pending) => {
            tracing::debug!(target: TRACING_TARGET, "Waiting for pending input to settle");
            (pending.await?, true)
        }
        other => (other, false),
    };

    let mut known_length = known_length;
    let mut filename = filename.filter(|name| !name.is_empty());
    let shape = settled.shape();

    let content = match settled {
        StashInput::Text(text) => FileContent::Bytes(Bytes::from(text)),
        StashInput::Binary(bytes) if !was_pending => FileContent::Bytes(bytes),
        StashInput::Stream(stream) if !was_pending => FileContent::Stream(stream),
        StashInput::Response(response) => {
            if known_length.is_none() {
                known_length = response
                    .header("content-length")
                    .and_then(|value| value.trim().parse::<u64>().ok());
            }
            if filename.is_none() {
                filename = response
                    .header("content-disposition")
                    .and_then(parse_filename)
                    .filter(|name| !name.is_empty());
            }

            let body = response.into_response_body();
            match (body.stream, body.content) {
                (Some(stream), _) => FileContent::Stream(stream),
                (None, Some(content)) => FileContent::Bytes(content),
                (None, None) => return Err(Error::unrecognized_input(shape)),
            }
        }
        _ => return Err(Error::unrecognized_input(shape)),
    };

    let filename = sanitize_filename(
        filename.as_deref().unwrap_or(default_filename),
        default_filename,
    );

    tracing::debug!(
        target: TRACING_TARGET,
        shape = %shape,
        was_pending,
        known_length,
        filename = %filename,
        "Normalized stash input"
    );

    Ok(NormalizedInput {
        content,
        known_length,
        filename,
    })
}
