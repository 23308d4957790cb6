//! Fallback delivery of large files to community file hosts.
//!
//! When an artifact is too large to hand to the user directly, it is uploaded
//! to whichever host accepts it:
//!
//! - **UploadBackend**: one host with a capacity ceiling
//! - **HttpBackend**: the single data-driven implementation of every host
//! - **RetryingTransport**: bounded immediate retries per host
//! - **UploaderPool**: capacity filter, random order, first success wins
//!
//! # Flow
//!
//! ```text
//!   upload(path, size)
//!         │
//!         ▼
//!   filter: max_upload_size_in_bytes >= size
//!         │
//!         ▼
//!   shuffle ──► backend A ──None──► backend B ──None──► ... ──► None
//!                  │                    │
//!                Some(url)           Some(url)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use podcastify::upload::{UploaderPool, UploaderPoolConfig};
//!
//! let pool = UploaderPool::from_config(&UploaderPoolConfig::default())?;
//! if size <= pool.max_upload_size_in_bytes() {
//!     let url = pool.upload(&path, size).await;
//! }
//! ```

pub mod backend;
pub mod catalog;
pub mod http_backend;
pub mod pool;
pub mod retry;
pub mod transport;

pub use backend::{remote_file_name, UploadBackend};
pub use catalog::{build_backends, default_backend_names, default_backend_specs};
pub use http_backend::{BackendSpec, BodyKind, HttpBackend, ResponseParser, UploadTarget};
pub use pool::{UploaderPool, UploaderPoolConfig};
pub use retry::RetryingTransport;
pub use transport::{
    FileBytes, ReqwestTransport, RequestBody, Transport, TransportResponse, UploadMethod,
    UploadRequest,
};
