//! Integration tests for the upload fallback chain over a fake transport.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use podcastify::upload::{
    RequestBody, Transport, TransportResponse, UploadMethod, UploadRequest, UploaderPool,
    UploaderPoolConfig,
};
use podcastify::UploadError;

/// Answers by host; unknown hosts get a 503. Records every request.
#[derive(Default)]
struct HostTransport {
    responses: HashMap<String, TransportResponse>,
    requests: Mutex<Vec<(UploadMethod, String, usize)>>,
}

impl HostTransport {
    fn with(mut self, host: &str, response: TransportResponse) -> Self {
        self.responses.insert(host.to_string(), response);
        self
    }

    fn requests(&self) -> Vec<(UploadMethod, String, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for HostTransport {
    async fn send(&self, request: UploadRequest) -> Result<TransportResponse, UploadError> {
        let size = match &request.body {
            RequestBody::Multipart { bytes, .. } | RequestBody::Raw(bytes) => bytes.len(),
        };
        self.requests
            .lock()
            .unwrap()
            .push((request.method, request.url.clone(), size));

        let host = reqwest::Url::parse(&request.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();
        Ok(self
            .responses
            .get(&host)
            .cloned()
            .unwrap_or_else(|| TransportResponse::new(503, "unavailable")))
    }
}

fn scratch_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
    file.write_all(contents).unwrap();
    file
}

fn only(name: &str) -> UploaderPoolConfig {
    let disabled = podcastify::upload::default_backend_names()
        .into_iter()
        .filter(|n| n != name)
        .collect();
    UploaderPoolConfig {
        disabled_backends: disabled,
        ..UploaderPoolConfig::default()
    }
}

#[tokio::test]
async fn test_every_backend_failing_yields_none_after_retries() {
    let file = scratch_file(b"episode");
    let transport = Arc::new(HostTransport::default());
    let pool = UploaderPool::with_transport(&UploaderPoolConfig::default(), transport.clone());

    let url = pool.upload(file.path(), 7).await;

    assert_eq!(url, None);
    // 11 backends, 3 attempts each.
    assert_eq!(transport.requests().len(), 33);
}

#[tokio::test]
async fn test_large_file_only_reaches_large_backends() {
    let file = scratch_file(b"episode");
    let transport = Arc::new(HostTransport::default());
    let pool = UploaderPool::with_transport(&UploaderPoolConfig::default(), transport.clone());

    // Above every 1 GiB host, within reol (10 GiB) and bashupload (50 GiB).
    let size = 5 * 1024 * 1024 * 1024;
    assert_eq!(pool.upload(file.path(), size).await, None);

    let mut hosts: Vec<String> = transport
        .requests()
        .into_iter()
        .map(|(_, url, _)| reqwest::Url::parse(&url).unwrap().host_str().unwrap().to_string())
        .collect();
    hosts.sort();
    hosts.dedup();
    assert_eq!(hosts, vec!["bashupload.com", "files.reol.com"]);
}

#[tokio::test]
async fn test_transfer_sh_host_link_is_rewritten() {
    let file = scratch_file(b"episode");
    let transport = Arc::new(HostTransport::default().with(
        "files.reol.com",
        TransportResponse::new(200, "http://files.reol.com/AbC123/talk.mp3\n"),
    ));
    let pool = UploaderPool::with_transport(&only("reol"), transport.clone());

    let url = pool.upload(file.path(), 7).await;
    assert_eq!(url.as_deref(), Some("https://files.reol.com/get/AbC123/talk.mp3"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let (method, target, size) = &requests[0];
    assert_eq!(*method, UploadMethod::Put);
    assert!(target.starts_with("https://files.reol.com/"));
    assert!(target.ends_with(".mp3"));
    assert_eq!(*size, 7);
}

#[tokio::test]
async fn test_bashupload_link_gets_download_suffix() {
    let file = scratch_file(b"episode");
    let transport = Arc::new(HostTransport::default().with(
        "bashupload.com",
        TransportResponse::new(
            200,
            "\n\nUploaded 1 file, 7 bytes\n\nwget https://bashupload.com/xyz/talk.mp3\n",
        ),
    ));
    let pool = UploaderPool::with_transport(&only("bashupload"), transport.clone());

    let url = pool.upload(file.path(), 7).await;
    assert_eq!(url.as_deref(), Some("https://bashupload.com/xyz/talk.mp3?download=1"));
}

#[tokio::test]
async fn test_fallback_reaches_the_one_working_host() {
    let file = scratch_file(b"episode");
    let transport = Arc::new(HostTransport::default().with(
        "api.filedoge.com",
        TransportResponse::new(200, r#"{"token":"deadbeef"}"#),
    ));
    let pool = UploaderPool::with_transport(&UploaderPoolConfig::default(), transport.clone());

    for _ in 0..5 {
        let url = pool.upload(file.path(), 7).await;
        assert_eq!(url.as_deref(), Some("https://api.filedoge.com/download/deadbeef"));
    }
}

#[tokio::test]
async fn test_unreadable_file_fails_without_requests() {
    let transport = Arc::new(HostTransport::default());
    let pool = UploaderPool::with_transport(&only("0x0"), transport.clone());

    let url = pool
        .upload(std::path::Path::new("/definitely/not/here.mp3"), 7)
        .await;
    assert_eq!(url, None);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
#[ignore] // Run with: cargo test --test upload_fallback -- --ignored
async fn test_live_upload_to_real_hosts() {
    let file = scratch_file(b"podcastify live upload check");
    let pool = UploaderPool::from_config(&UploaderPoolConfig::default()).expect("client should build");

    let url = pool.upload(file.path(), 28).await;
    assert!(url.is_some(), "no host accepted the file");
}
