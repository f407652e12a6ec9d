//! Interpretation of the store's answer to an upload.

use crate::target::UploadTarget;
use crate::transport::TransportResponse;
use crate::{Error, Result};

/// Status the store answers a successful form upload with.
pub const SUCCESS_STATUS: u16 = 204;

/// Text the store puts in the body when it could not establish the length.
pub const STORE_LENGTH_COMPLAINT: &str = "You must provide the Content-Length HTTP header.";

/// Maps the upload response to the retrieval URL or a typed failure.
///
/// Only [`SUCCESS_STATUS`] counts as success; other 2xx statuses are
/// reported as [`Error::UploadFailed`] like any other unexpected answer.
pub fn classify(response: &TransportResponse, target: &UploadTarget) -> Result<String> {
    let status = response.status();
    if status == SUCCESS_STATUS {
        return target
            .retrieval_url()
            .ok_or_else(|| Error::negotiation("upload target has no key"));
    }

    let body = response.content();
    if body.contains(STORE_LENGTH_COMPLAINT) {
        return Err(Error::LengthRequired);
    }

    Err(Error::upload_failed(status, body))
}
