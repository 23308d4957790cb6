//! Chooses how a finished file reaches the user.
//!
//! Small files are handed over directly. Anything above the direct limit goes
//! through the [`UploaderPool`] if some host can take it.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::upload::UploaderPool;

/// Largest file sent directly, in bytes.
pub const DEFAULT_DIRECT_LIMIT_BYTES: u64 = 50 * 1024 * 1024;

/// Route a file of a given size would take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPlan {
    Direct,
    Upload,
    TooLarge,
}

/// Outcome of delivering one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    Direct { path: PathBuf },
    Uploaded { url: String },
    UploadFailed,
    TooLarge { size: u64, max: u64 },
}

impl Delivery {
    /// Whether the local file is still needed after delivery.
    pub fn keeps_local_file(&self) -> bool {
        matches!(self, Delivery::Direct { .. })
    }

    fn log(self, path: &Path) -> Self {
        match &self {
            Delivery::Direct { .. } => info!(file = %path.display(), "Delivering directly"),
            Delivery::Uploaded { url } => info!(file = %path.display(), url = %url, "Delivered via upload"),
            Delivery::UploadFailed => warn!(file = %path.display(), "Upload fallback exhausted"),
            Delivery::TooLarge { .. } => {}
        }
        self
    }
}

pub struct DeliveryPlanner {
    direct_limit_bytes: u64,
    uploader: UploaderPool,
}

impl DeliveryPlanner {
    pub fn new(direct_limit_bytes: u64, uploader: UploaderPool) -> Self {
        Self {
            direct_limit_bytes,
            uploader,
        }
    }

    pub fn plan(&self, size: u64) -> DeliveryPlan {
        if size <= self.direct_limit_bytes {
            DeliveryPlan::Direct
        } else if size <= self.uploader.max_upload_size_in_bytes() {
            DeliveryPlan::Upload
        } else {
            DeliveryPlan::TooLarge
        }
    }

    pub async fn deliver(&self, path: &Path, size: u64) -> Delivery {
        match self.plan(size) {
            DeliveryPlan::Direct => Delivery::Direct {
                path: path.to_path_buf(),
            },
            DeliveryPlan::Upload => match self.uploader.upload(path, size).await {
                Some(url) => Delivery::Uploaded { url },
                None => Delivery::UploadFailed,
            },
            DeliveryPlan::TooLarge => {
                let max = self.uploader.max_upload_size_in_bytes();
                warn!(file = %path.display(), size, max, "File exceeds every delivery route");
                Delivery::TooLarge { size, max }
            }
        }
        .log(path)
    }
}
