//! JSON-RPC upload negotiator.

use nvisy_stash::{UploadNegotiator, UploadTarget};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::connect::ReqwestClient;
use crate::error::Error;

/// Tracing target for upload negotiation.
pub const TRACING_TARGET: &str = "nvisy_reqwest::negotiator";

/// Remote procedure that issues presigned upload targets.
pub const PRESIGN_METHOD: &str = "get_presigned_upload_post_data";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: [(); 0],
}

impl<'a> RpcRequest<'a> {
    fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params: [],
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<UploadTarget>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Renders a JSON-RPC error member, which may be an object or a bare value.
fn describe_error(error: &serde_json::Value) -> String {
    match error.get("message").and_then(serde_json::Value::as_str) {
        Some(message) => match error.get("code").and_then(serde_json::Value::as_i64) {
            Some(code) => format!("{message} (code {code})"),
            None => message.to_owned(),
        },
        None => match error.as_str() {
            Some(message) => message.to_owned(),
            None => error.to_string(),
        },
    }
}

/// Interprets the body of a successful RPC answer.
fn parse_target(body: &[u8]) -> nvisy_stash::Result<UploadTarget> {
    let response: RpcResponse = serde_json::from_slice(body).map_err(|e| {
        nvisy_stash::Error::negotiation("malformed RPC response").with_source(e)
    })?;

    if let Some(error) = response.error {
        return Err(nvisy_stash::Error::negotiation(format!(
            "{PRESIGN_METHOD} failed: {}",
            describe_error(&error)
        )));
    }

    let target = response.result.ok_or_else(|| {
        nvisy_stash::Error::negotiation(format!("{PRESIGN_METHOD} returned no result"))
    })?;
    target.validate()?;
    Ok(target)
}

/// Negotiator that obtains upload targets from a JSON-RPC endpoint.
///
/// Every call posts a fresh `get_presigned_upload_post_data` request; targets
/// are never cached.
#[derive(Debug, Clone)]
pub struct RpcNegotiator {
    client: ReqwestClient,
    endpoint: Url,
    headers: Vec<(String, String)>,
}

impl RpcNegotiator {
    /// Creates a negotiator calling `endpoint` through `client`.
    pub fn new(client: ReqwestClient, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            headers: Vec::new(),
        }
    }

    /// Adds a header sent with every RPC call, e.g. for authentication.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the RPC endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl UploadNegotiator for RpcNegotiator {
    async fn negotiate(&self) -> nvisy_stash::Result<UploadTarget> {
        let envelope = RpcRequest::new(PRESIGN_METHOD);

        tracing::debug!(
            target: TRACING_TARGET,
            request_id = %envelope.id,
            host = self.endpoint.host_str().unwrap_or_default(),
            "Requesting upload target"
        );

        let mut request = self.client.http().post(self.endpoint.clone()).json(&envelope);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(Error::from)?;
        let status = response.status();
        let body = response.bytes().await.map_err(Error::from)?;

        if !status.is_success() {
            tracing::warn!(
                target: TRACING_TARGET,
                request_id = %envelope.id,
                status = status.as_u16(),
                "Upload target request rejected"
            );
            return Err(nvisy_stash::Error::negotiation(format!(
                "{PRESIGN_METHOD} answered {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        let target = parse_target(&body)?;

        tracing::debug!(
            target: TRACING_TARGET,
            request_id = %envelope.id,
            fields = target.fields.len(),
            "Received upload target"
        );

        Ok(target)
    }
}
