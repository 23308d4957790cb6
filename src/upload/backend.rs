//! The upload backend capability.

use std::path::Path;

use async_trait::async_trait;

/// A single remote file host.
///
/// `upload` never fails loudly: every error (file read, network, malformed
/// response) is logged inside the backend and reported as `None`.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Short identifier used in logs and configuration.
    fn name(&self) -> &str;

    /// Largest file, in bytes, this backend accepts.
    fn max_upload_size_in_bytes(&self) -> u64;

    /// Uploads the file and returns its delivery URL.
    async fn upload(&self, file_path: &Path, file_size_in_bytes: u64) -> Option<String>;
}

/// Name under which a file is stored remotely.
///
/// The path's base name, or `<uuid>.mp3` when the path has none.
pub fn remote_file_name(file_path: &Path) -> String {
    file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{}.mp3", uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_name_uses_base_name() {
        assert_eq!(
            remote_file_name(Path::new("/tmp/abc/episode.mp3")),
            "episode.mp3"
        );
    }

    #[test]
    fn test_remote_file_name_generates_when_missing() {
        let name = remote_file_name(Path::new("/"));
        assert!(name.ends_with(".mp3"));
        assert_eq!(name.len(), 36 + 4);

        let other = remote_file_name(Path::new(".."));
        assert!(other.ends_with(".mp3"));
        assert_ne!(name, other);
    }
}
