//! Built-in list of community file hosts.

use std::sync::Arc;

use super::backend::UploadBackend;
use super::http_backend::{BackendSpec, BodyKind, HttpBackend, ResponseParser, UploadTarget};
use super::retry::RetryingTransport;
use super::transport::{Transport, UploadMethod};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Every host podcastify knows how to upload to.
pub fn default_backend_specs() -> Vec<BackendSpec> {
    vec![
        BackendSpec {
            name: "0x0".to_string(),
            origin: "https://0x0.st".to_string(),
            max_upload_size_in_bytes: 512 * MIB,
            method: UploadMethod::Post,
            body: BodyKind::Multipart,
            target: UploadTarget::Origin,
            parser: ResponseParser::PlainUrl,
        },
        BackendSpec::transfer_sh("gbx", "https://share.gbx-co.re", 512 * MIB),
        BackendSpec::transfer_sh("kuwaitnet", "https://transfer.kuwaitnet.support", 512 * MIB),
        BackendSpec::transfer_sh("intermb", "https://transfer.tech.intermb.ru", 512 * MIB),
        BackendSpec::transfer_sh("ambrosus", "https://transfer.ambrosus.io", 512 * MIB),
        BackendSpec::transfer_sh("shub", "https://t.s-hub.xyz", 512 * MIB),
        BackendSpec::transfer_sh("tarrhu", "https://big.tarr.hu", GIB),
        BackendSpec::transfer_sh("reol", "https://files.reol.com", 10 * GIB),
        BackendSpec::transfer_sh("libriciel", "https://curl.libriciel.fr", GIB),
        BackendSpec {
            name: "filedoge".to_string(),
            origin: "https://api.filedoge.com/upload".to_string(),
            max_upload_size_in_bytes: 200 * MIB,
            method: UploadMethod::Post,
            body: BodyKind::Multipart,
            target: UploadTarget::Origin,
            parser: ResponseParser::JsonToken {
                field: "token".to_string(),
                download_prefix: "https://api.filedoge.com/download/".to_string(),
            },
        },
        BackendSpec {
            name: "bashupload".to_string(),
            origin: "https://bashupload.com".to_string(),
            max_upload_size_in_bytes: 50 * GIB,
            method: UploadMethod::Put,
            body: BodyKind::Raw,
            target: UploadTarget::OriginWithFileName,
            parser: ResponseParser::FirstLink {
                suffix: "?download=1".to_string(),
            },
        },
    ]
}

/// Names of all built-in hosts.
pub fn default_backend_names() -> Vec<String> {
    default_backend_specs().into_iter().map(|spec| spec.name).collect()
}

/// Instantiates one [`HttpBackend`] per spec, all sharing `transport`.
pub fn build_backends(
    specs: Vec<BackendSpec>,
    transport: Arc<dyn Transport>,
    retry: RetryingTransport,
) -> Vec<Arc<dyn UploadBackend>> {
    specs
        .into_iter()
        .map(|spec| {
            Arc::new(HttpBackend::new(spec, Arc::clone(&transport), retry)) as Arc<dyn UploadBackend>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let names = default_backend_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert_eq!(names.len(), 11);
    }

    #[test]
    fn test_catalog_origins_are_https() {
        for spec in default_backend_specs() {
            assert!(spec.origin.starts_with("https://"), "{}", spec.name);
            assert!(spec.max_upload_size_in_bytes >= 200 * MIB, "{}", spec.name);
        }
    }

    #[test]
    fn test_largest_capacity_is_bashupload() {
        let largest = default_backend_specs()
            .into_iter()
            .max_by_key(|spec| spec.max_upload_size_in_bytes)
            .unwrap();
        assert_eq!(largest.name, "bashupload");
        assert_eq!(largest.max_upload_size_in_bytes, 50 * GIB);
    }
}
