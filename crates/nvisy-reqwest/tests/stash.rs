//! End-to-end stash tests against a local mock object store and RPC endpoint.

use bytes::Bytes;
use nvisy_reqwest::{ReqwestClient, ReqwestConfig, RpcNegotiator};
use nvisy_stash::mock::MockNegotiator;
use nvisy_stash::transport::ByteStream;
use nvisy_stash::{ErrorKind, FileStasher, STORE_LENGTH_COMPLAINT, StashInput};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const NOTES: &str = "thirty-seven bytes of meeting notes..";

fn client() -> ReqwestClient {
    ReqwestClient::new(ReqwestConfig::default().with_timeout(10)).unwrap()
}

fn stasher(server: &MockServer, client: &ReqwestClient) -> FileStasher {
    let endpoint = Url::parse(&format!("{}/rpc", server.uri())).unwrap();
    let negotiator = RpcNegotiator::new(client.clone(), endpoint).with_header("X-Api-Key", "secret");
    client.clone().into_stasher().with_negotiator(negotiator)
}

/// RPC answer with fields in a deliberately non-alphabetical wire order.
fn target_body(server: &MockServer, key: &str) -> String {
    format!(
        r#"{{"jsonrpc":"2.0","id":"1","result":{{"url":"{}/bucket/","fields":{{"key":"{key}","AWSAccessKeyId":"AKIAEXAMPLE","policy":"eyJleHBpcmF0aW9uIjoi","signature":"c2lnbmF0dXJl"}}}}}}"#,
        server.uri()
    )
}

async fn mount_rpc(server: &MockServer, key: &str) {
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(header("X-Api-Key", "secret"))
        .and(body_partial_json(json!({
            "jsonrpc": "2.0",
            "method": "get_presigned_upload_post_data",
            "params": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(target_body(server, key), "application/json"))
        .mount(server)
        .await;
}

async fn mount_store(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/bucket/"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn uploads(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == "/bucket/")
        .collect()
}

fn body_text(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}

fn declared_length(request: &Request) -> Option<usize> {
    request
        .headers
        .get("content-length")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

#[tokio::test]
async fn test_text_is_uploaded_as_multipart() {
    let server = MockServer::start().await;
    mount_rpc(&server, "stash/abc/hello.txt").await;
    mount_store(&server, ResponseTemplate::new(204)).await;

    let client = client();
    let url = stasher(&server, &client)
        .stash_file("hello world", None, Some("hello.txt"))
        .await
        .unwrap();
    assert_eq!(url, format!("{}/bucket/stash/abc/hello.txt", server.uri()));

    let uploads = uploads(&server).await;
    assert_eq!(uploads.len(), 1);
    let upload = &uploads[0];

    let content_type = upload.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert_eq!(declared_length(upload), Some(upload.body.len()));

    let body = body_text(upload);
    let order = [
        "name=\"key\"\r\n\r\nstash/abc/hello.txt\r\n",
        "name=\"AWSAccessKeyId\"",
        "name=\"policy\"",
        "name=\"signature\"",
        "name=\"Content-Disposition\"\r\n\r\nattachment; filename=\"hello.txt\"\r\n",
        "name=\"file\"; filename=\"hello.txt\"\r\nContent-Type: binary/octet-stream\r\n\r\nhello world\r\n",
    ];
    let positions: Vec<usize> = order.iter().map(|part| body.find(part).unwrap()).collect();
    assert!(
        positions.windows(2).all(|pair| pair[0] < pair[1]),
        "parts out of order: {positions:?}"
    );
}

#[tokio::test]
async fn test_raw_download_is_stashed_with_its_headers() {
    let server = MockServer::start().await;
    mount_rpc(&server, "stash/def/notes.txt").await;
    mount_store(&server, ResponseTemplate::new(204)).await;
    Mock::given(method("GET"))
        .and(path("/files/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"notes.txt\"")
                .set_body_string(NOTES),
        )
        .mount(&server)
        .await;

    let client = client();
    let file_url = Url::parse(&format!("{}/files/1", server.uri())).unwrap();
    let download = client.get_raw(file_url).await.unwrap();
    assert!(download.is_raw());
    assert_eq!(download.header("content-length"), Some("37"));

    let url = stasher(&server, &client)
        .stash_file(download, None, None)
        .await
        .unwrap();
    assert!(url.ends_with("/bucket/stash/def/notes.txt"));

    let uploads = uploads(&server).await;
    let body = body_text(&uploads[0]);
    assert!(body.contains("attachment; filename=\"notes.txt\""));
    assert!(body.contains(&format!("\r\n\r\n{NOTES}\r\n--")));
    assert_eq!(declared_length(&uploads[0]), Some(uploads[0].body.len()));
}

#[tokio::test]
async fn test_pending_download_is_stashed() {
    let server = MockServer::start().await;
    mount_rpc(&server, "stash/ghi/report.csv").await;
    mount_store(&server, ResponseTemplate::new(204)).await;
    Mock::given(method("GET"))
        .and(path("/files/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
        .mount(&server)
        .await;

    let client = client();
    let file_url = Url::parse(&format!("{}/files/2", server.uri())).unwrap();
    let downloader = client.clone();
    let pending = StashInput::pending(async move { downloader.get_raw(file_url).await });

    stasher(&server, &client)
        .stash_file(pending, None, Some("report.csv"))
        .await
        .unwrap();

    let body = body_text(&uploads(&server).await[0]);
    assert!(body.contains("filename=\"report.csv\""));
    assert!(body.contains("\r\n\r\na,b\n1,2\n\r\n--"));
}

#[tokio::test]
async fn test_stream_with_known_length_is_not_chunked() {
    let server = MockServer::start().await;
    mount_rpc(&server, "stash/jkl/data.bin").await;
    mount_store(&server, ResponseTemplate::new(204)).await;

    let chunks: Vec<std::io::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"first,")),
        Ok(Bytes::from_static(b"second")),
    ];
    let stream: ByteStream = Box::pin(futures::stream::iter(chunks));

    let client = client();
    stasher(&server, &client)
        .stash_file(stream, Some(12), Some("data.bin"))
        .await
        .unwrap();

    let uploads = uploads(&server).await;
    assert!(uploads[0].headers.get("transfer-encoding").is_none());
    assert_eq!(declared_length(&uploads[0]), Some(uploads[0].body.len()));
    assert!(body_text(&uploads[0]).contains("first,second"));
}

#[tokio::test]
async fn test_rpc_error_prevents_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "error": { "code": -32001, "message": "account suspended" }
        })))
        .mount(&server)
        .await;
    mount_store(&server, ResponseTemplate::new(204)).await;

    let client = client();
    let error = stasher(&server, &client)
        .stash_file("hello", None, None)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Negotiation);
    assert!(error.to_string().contains("account suspended"));
    assert!(uploads(&server).await.is_empty());
}

#[tokio::test]
async fn test_rpc_http_failure_is_negotiation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = client();
    let error = stasher(&server, &client)
        .stash_file("hello", None, None)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Negotiation);
    assert!(error.to_string().contains("503"));
}

#[tokio::test]
async fn test_store_rejection_is_upload_failure() {
    let server = MockServer::start().await;
    mount_rpc(&server, "stash/mno/x").await;
    mount_store(
        &server,
        ResponseTemplate::new(403).set_body_string("<Error><Code>AccessDenied</Code></Error>"),
    )
    .await;

    let client = client();
    let error = stasher(&server, &client)
        .stash_file("hello", None, None)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::UploadFailed);
    assert_eq!(
        error.to_string(),
        "Got 403 - <Error><Code>AccessDenied</Code></Error>"
    );
}

#[tokio::test]
async fn test_store_length_complaint_is_length_required() {
    let server = MockServer::start().await;
    mount_rpc(&server, "stash/pqr/x").await;
    mount_store(
        &server,
        ResponseTemplate::new(411).set_body_string(format!(
            "<Error><Code>MissingContentLength</Code><Message>{STORE_LENGTH_COMPLAINT}</Message></Error>"
        )),
    )
    .await;

    let client = client();
    let error = stasher(&server, &client)
        .stash_file("hello", None, None)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::LengthRequired);
}

#[tokio::test]
async fn test_unreachable_store_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "url": "http://127.0.0.1:9/bucket/", "fields": { "key": "k" } }
        })))
        .mount(&server)
        .await;

    let client = client();
    let error = stasher(&server, &client)
        .stash_file("hello", None, None)
        .await
        .unwrap_err();

    assert!(matches!(error.kind(), ErrorKind::Network | ErrorKind::Timeout));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_reqwest_transport_with_mock_negotiator() {
    let server = MockServer::start().await;
    mount_store(&server, ResponseTemplate::new(204)).await;

    let negotiator = MockNegotiator::new(format!("{}/bucket/", server.uri()));
    let stasher = client().into_stasher().with_negotiator(negotiator.clone());

    let first = stasher.stash_file("same", None, None).await.unwrap();
    let second = stasher.stash_file("same", None, None).await.unwrap();

    assert_ne!(first, second);
    assert!(first.ends_with("/bucket/stash/1/file"));
    assert_eq!(negotiator.call_count(), 2);
    assert_eq!(uploads(&server).await.len(), 2);
}
