//! HTTP transport for upload backends.
//!
//! Backends describe a request as data ([`UploadRequest`]) and hand it to a
//! [`Transport`]. The production transport is [`ReqwestTransport`]; tests swap
//! in an in-process fake.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::error::UploadError;

/// Default per-request timeout; uploads can be hundreds of megabytes.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// File contents shared between retry attempts; clones share one buffer.
pub type FileBytes = Bytes;

/// HTTP method used for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMethod {
    Put,
    Post,
}

/// Request body of an upload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// `multipart/form-data` with a single file part.
    Multipart {
        field: String,
        file_name: String,
        bytes: FileBytes,
    },
    /// The file bytes as the raw request body.
    Raw(FileBytes),
}

/// A single upload request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub method: UploadMethod,
    pub url: String,
    pub body: RequestBody,
}

/// Status and text body of an upload response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one upload request. Implementations do not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: UploadRequest) -> Result<TransportResponse, UploadError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Client` if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("podcastify/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: UploadRequest) -> Result<TransportResponse, UploadError> {
        let builder = match request.method {
            UploadMethod::Put => self.client.put(&request.url),
            UploadMethod::Post => self.client.post(&request.url),
        };

        let builder = match request.body {
            RequestBody::Multipart {
                field,
                file_name,
                bytes,
            } => {
                let length = bytes.len() as u64;
                let part = Part::stream_with_length(bytes, length).file_name(file_name);
                builder.multipart(Form::new().part(field, part))
            }
            RequestBody::Raw(bytes) => builder.body(bytes),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| UploadError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::RequestFailed(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
