//! Parameterized HTTP upload backend.
//!
//! Every supported host follows the same flow: read the file, send it to the
//! origin (optionally suffixed with the file name), and turn the response body
//! into a delivery URL. Hosts differ only in data, captured by [`BackendSpec`].

use std::path::Path;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::UploadError;

use super::backend::{remote_file_name, UploadBackend};
use super::retry::RetryingTransport;
use super::transport::{FileBytes, RequestBody, Transport, UploadMethod, UploadRequest};

/// Name of the multipart field carrying the file.
const MULTIPART_FIELD: &str = "file";

/// File name announced inside the multipart part.
const MULTIPART_FILE_NAME: &str = "podcast.mp3";

static LINK_PATTERN: OnceLock<Regex> = OnceLock::new();

fn link_pattern() -> &'static Regex {
    LINK_PATTERN.get_or_init(|| Regex::new(r#"https?://[^\s<>"'`]+"#).expect("Invalid regex for links"))
}

/// How the file travels in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Multipart,
    Raw,
}

/// Where the request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    /// `{origin}`
    Origin,
    /// `{origin}/{file-name}`
    OriginWithFileName,
}

/// Turns a successful response body into a delivery URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseParser {
    /// The trimmed body is the URL.
    PlainUrl,
    /// transfer.sh convention: force `https` and prefix the path with `/get`.
    TransferSh,
    /// JSON body with a token field appended to a fixed download prefix.
    JsonToken {
        field: String,
        download_prefix: String,
    },
    /// First URL found anywhere in the body, followed by `suffix`.
    FirstLink { suffix: String },
}

impl ResponseParser {
    /// # Errors
    ///
    /// Returns `UploadError::InvalidResponse` for empty bodies, missing fields
    /// or unparsable URLs.
    pub fn parse(&self, body: &str) -> Result<String, UploadError> {
        let text = body.trim();
        if text.is_empty() {
            return Err(UploadError::InvalidResponse("empty body".to_string()));
        }

        match self {
            ResponseParser::PlainUrl => {
                parse_url(text)?;
                Ok(text.to_string())
            }
            ResponseParser::TransferSh => {
                let mut url = parse_url(text)?;
                url.set_scheme("https").map_err(|_| {
                    UploadError::InvalidResponse(format!("cannot use https for '{}'", text))
                })?;
                let path = format!("/get{}", url.path());
                url.set_path(&path);
                Ok(url.to_string())
            }
            ResponseParser::JsonToken {
                field,
                download_prefix,
            } => {
                let json: serde_json::Value = serde_json::from_str(text)
                    .map_err(|e| UploadError::InvalidResponse(format!("not JSON: {}", e)))?;
                let token = json
                    .get(field)
                    .and_then(|v| v.as_str())
                    .filter(|token| !token.is_empty())
                    .ok_or_else(|| {
                        UploadError::InvalidResponse(format!("missing '{}' field", field))
                    })?;
                Ok(format!("{}{}", download_prefix, token))
            }
            ResponseParser::FirstLink { suffix } => {
                let link = link_pattern()
                    .find(text)
                    .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '}']))
                    .ok_or_else(|| UploadError::InvalidResponse("no links found".to_string()))?;
                parse_url(link)?;
                Ok(format!("{}{}", link, suffix))
            }
        }
    }
}

fn parse_url(text: &str) -> Result<Url, UploadError> {
    Url::parse(text)
        .map_err(|e| UploadError::InvalidResponse(format!("invalid URL '{}': {}", text, e)))
}

/// Static description of one file host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    pub name: String,
    pub origin: String,
    pub max_upload_size_in_bytes: u64,
    pub method: UploadMethod,
    pub body: BodyKind,
    pub target: UploadTarget,
    pub parser: ResponseParser,
}

impl BackendSpec {
    /// A transfer.sh-compatible host: multipart PUT to `{origin}/{name}`.
    pub fn transfer_sh(
        name: impl Into<String>,
        origin: impl Into<String>,
        max_upload_size_in_bytes: u64,
    ) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            max_upload_size_in_bytes,
            method: UploadMethod::Put,
            body: BodyKind::Multipart,
            target: UploadTarget::OriginWithFileName,
            parser: ResponseParser::TransferSh,
        }
    }

    /// URL the request for `file_name` goes to. The name is appended as one
    /// percent-encoded path segment.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidUrl` if the origin cannot take a path.
    pub fn target_url(&self, file_name: &str) -> Result<String, UploadError> {
        let origin = self.origin.trim_end_matches('/');
        if self.target == UploadTarget::Origin {
            return Ok(origin.to_string());
        }

        let invalid = |reason: String| UploadError::InvalidUrl {
            url: self.origin.clone(),
            reason,
        };
        let mut url = Url::parse(origin).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("origin cannot have a path".to_string()))?
            .pop_if_empty()
            .push(file_name);
        Ok(url.to_string())
    }

    fn request(&self, url: String, bytes: FileBytes) -> UploadRequest {
        let body = match self.body {
            BodyKind::Multipart => RequestBody::Multipart {
                field: MULTIPART_FIELD.to_string(),
                file_name: MULTIPART_FILE_NAME.to_string(),
                bytes,
            },
            BodyKind::Raw => RequestBody::Raw(bytes),
        };
        UploadRequest {
            method: self.method,
            url,
            body,
        }
    }
}

/// [`UploadBackend`] driven by a [`BackendSpec`].
pub struct HttpBackend {
    spec: BackendSpec,
    transport: Arc<dyn Transport>,
    retry: RetryingTransport,
}

impl HttpBackend {
    pub fn new(spec: BackendSpec, transport: Arc<dyn Transport>, retry: RetryingTransport) -> Self {
        Self {
            spec,
            transport,
            retry,
        }
    }

    async fn try_upload(&self, file_path: &Path) -> Result<String, UploadError> {
        let bytes: FileBytes = tokio::fs::read(file_path)
            .await
            .map_err(|source| UploadError::FileRead {
                path: file_path.display().to_string(),
                source,
            })?
            .into();

        let url = self.spec.target_url(&remote_file_name(file_path))?;

        self.retry
            .execute(&self.spec.name, |attempt| {
                let request = self.spec.request(url.clone(), bytes.clone());
                async move {
                    debug!(backend = %self.spec.name, attempt, url = %request.url, "Sending upload request");
                    let response = self.transport.send(request).await?;
                    if !response.is_success() {
                        return Err(UploadError::Status {
                            status: response.status,
                            body: response.body,
                        });
                    }
                    self.spec.parser.parse(&response.body)
                }
            })
            .await
    }
}

#[async_trait]
impl UploadBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn max_upload_size_in_bytes(&self) -> u64 {
        self.spec.max_upload_size_in_bytes
    }

    async fn upload(&self, file_path: &Path, file_size_in_bytes: u64) -> Option<String> {
        match self.try_upload(file_path).await {
            Ok(url) => {
                info!(
                    backend = %self.spec.name,
                    size = file_size_in_bytes,
                    url = %url,
                    "File uploaded"
                );
                Some(url)
            }
            Err(err) => {
                warn!(
                    backend = %self.spec.name,
                    size = file_size_in_bytes,
                    error = %err,
                    "Upload backend failed"
                );
                None
            }
        }
    }
}
