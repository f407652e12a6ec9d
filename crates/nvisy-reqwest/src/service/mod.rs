//! Stash collaborator implementations.
//!
//! This module implements [`HttpTransport`] for [`ReqwestClient`] and
//! provides the JSON-RPC [`RpcNegotiator`].

mod negotiator;

use futures::TryStreamExt;
use nvisy_stash::transport::{
    Headers, HttpTransport, Method, RequestBody, ResponseMode, TransportRequest, TransportResponse,
};
use reqwest::header::CONTENT_LENGTH;
use url::Url;

pub use self::negotiator::{PRESIGN_METHOD, RpcNegotiator};
use crate::connect::{ReqwestClient, TRACING_TARGET};
use crate::error::Error;

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn to_headers(headers: &reqwest::header::HeaderMap) -> Headers {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_owned(), value.to_owned()))
        })
        .collect()
}

impl ReqwestClient {
    /// Issues a raw-mode GET, returning as soon as the headers arrive.
    ///
    /// The response can be passed to
    /// [`FileStasher::stash_file`](nvisy_stash::FileStasher::stash_file)
    /// as is, or wrapped in a pending input.
    pub async fn get_raw(&self, url: Url) -> nvisy_stash::Result<TransportResponse> {
        self.send(TransportRequest::get(url).raw()).await
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestClient {
    async fn send(&self, request: TransportRequest) -> nvisy_stash::Result<TransportResponse> {
        let TransportRequest {
            url,
            method,
            headers,
            body,
            mode,
            timeout,
        } = request;

        tracing::debug!(
            target: TRACING_TARGET,
            method = %method,
            host = url.host_str().unwrap_or_default(),
            path = url.path(),
            body_length = body.len(),
            raw = mode == ResponseMode::Raw,
            "Sending request"
        );

        let mut http_request = self.http().request(to_reqwest_method(method), url);
        for (name, value) in headers.iter() {
            http_request = http_request.header(name, value);
        }
        if let Some(timeout) = timeout {
            http_request = http_request.timeout(timeout);
        }

        http_request = match body {
            RequestBody::Empty => http_request,
            RequestBody::Bytes(bytes) => http_request.body(bytes),
            RequestBody::Stream { stream, length } => {
                if let Some(length) = length {
                    http_request = http_request.header(CONTENT_LENGTH, length);
                }
                http_request.body(reqwest::Body::wrap_stream(stream))
            }
        };

        let effective_timeout = timeout.unwrap_or_else(|| self.config().effective_timeout());
        let http_response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                nvisy_stash::Error::timeout(Some(effective_timeout)).with_source(e)
            } else {
                Error::from(e).into()
            }
        })?;

        let status = http_response.status().as_u16();
        let headers = to_headers(http_response.headers());

        tracing::debug!(
            target: TRACING_TARGET,
            status,
            "Received response"
        );

        let response = match mode {
            ResponseMode::Buffered => {
                let bytes = http_response.bytes().await.map_err(Error::from)?;
                TransportResponse::buffered(status, headers, bytes)
            }
            ResponseMode::Raw => {
                let stream = http_response.bytes_stream().map_err(std::io::Error::other);
                TransportResponse::raw(status, headers, Box::pin(stream))
            }
        };

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(Method::Post), reqwest::Method::POST);
        assert_eq!(to_reqwest_method(Method::Get).as_str(), Method::Get.as_ref());
        assert_eq!(to_reqwest_method(Method::Delete).as_str(), "DELETE");
    }

    #[test]
    fn test_header_conversion_skips_opaque_values() {
        let mut map = reqwest::header::HeaderMap::new();
        map.insert("content-length", "37".parse().unwrap());
        map.insert(
            "x-binary",
            reqwest::header::HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap(),
        );

        let headers = to_headers(&map);
        assert_eq!(headers.get("Content-Length"), Some("37"));
        assert!(!headers.contains("x-binary"));
    }
}
