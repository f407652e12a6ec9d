//! `multipart/form-data` encoding with an up-front length.

use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;

use super::{FILE_FIELD, FilePart, FormField, UploadForm};
use crate::input::FileContent;
use crate::transport::{ByteStream, RequestBody};
use crate::{Error, Result};

const CRLF: &[u8] = b"\r\n";

/// Escapes a multipart parameter value the way browsers do.
fn escape_param(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn field_header(boundary: &str, field: &FormField) -> String {
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n",
        escape_param(&field.name)
    )
}

fn file_header(boundary: &str, file: &FilePart) -> String {
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{FILE_FIELD}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        escape_param(&file.filename),
        file.content_type
    )
}

fn closing(boundary: &str) -> String {
    format!("--{boundary}--\r\n")
}

impl UploadForm {
    /// Everything before the file content: plain fields and the file header.
    fn preamble(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        for field in &self.fields {
            buf.put_slice(field_header(&self.boundary, field).as_bytes());
            buf.put_slice(field.value.as_bytes());
            buf.put_slice(CRLF);
        }
        if let Some(file) = &self.file {
            buf.put_slice(file_header(&self.boundary, file).as_bytes());
        }
        buf
    }

    /// Everything after the file content.
    fn trailer(&self) -> Bytes {
        let mut buf = BytesMut::new();
        if self.file.is_some() {
            buf.put_slice(CRLF);
        }
        buf.put_slice(closing(&self.boundary).as_bytes());
        buf.freeze()
    }

    /// Computes the exact encoded length of the form.
    ///
    /// Fails with [`Error::LengthRequired`] when the file part is a stream
    /// with no declared length, and with [`Error::TooLarge`] when the total
    /// does not fit in a `u64`.
    pub fn content_length(&self) -> Result<u64> {
        let file_length = match &self.file {
            Some(file) => file.length().ok_or(Error::LengthRequired)?,
            None => 0,
        };
        let overhead = (self.preamble().len() + self.trailer().len()) as u64;
        file_length
            .checked_add(overhead)
            .ok_or_else(|| Error::too_large(file_length, u64::MAX - overhead))
    }

    /// Encodes the form into a request body with a known length.
    ///
    /// Performs the same check as [`content_length`](Self::content_length)
    /// and never starts reading the file content when it fails.
    pub fn into_body(self) -> Result<RequestBody> {
        let length = self.content_length()?;
        let mut preamble = self.preamble();
        let trailer = self.trailer();

        let file = match self.file {
            None => {
                preamble.put_slice(&trailer);
                return Ok(RequestBody::Bytes(preamble.freeze()));
            }
            Some(file) => file,
        };

        let body = match file.content {
            FileContent::Bytes(content) if file.known_length.is_none() => {
                preamble.put_slice(&content);
                preamble.put_slice(&trailer);
                RequestBody::Bytes(preamble.freeze())
            }
            FileContent::Bytes(content) => RequestBody::Stream {
                stream: chain(preamble.freeze(), single(content), trailer),
                length: Some(length),
            },
            FileContent::Stream(stream) => RequestBody::Stream {
                stream: chain(preamble.freeze(), stream, trailer),
                length: Some(length),
            },
        };

        Ok(body)
    }
}

fn single(bytes: Bytes) -> ByteStream {
    Box::pin(futures::stream::once(async move {
        Ok::<_, std::io::Error>(bytes)
    }))
}

fn chain(preamble: Bytes, content: ByteStream, trailer: Bytes) -> ByteStream {
    Box::pin(single(preamble).chain(content).chain(single(trailer)))
}
