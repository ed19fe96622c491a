//! Blob download for the upload-driven entry point.

use std::{
    future::Future,
    path::{Component, Path, PathBuf},
};

use tokio::fs;
use tracing::debug;

use crate::{StoreError, StoreResult};

pub trait BlobStore: Send + Sync {
    fn download(&self, path: &str) -> impl Future<Output = StoreResult<Vec<u8>>> + Send;
}

/// Blobs served from a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        let rel = Path::new(path.trim_start_matches('/'));
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || path.trim().is_empty() {
            return Err(StoreError::InvalidDocument(format!(
                "blob path escapes the store root: {path}"
            )));
        }
        Ok(self.root.join(rel))
    }
}

impl BlobStore for LocalBlobStore {
    async fn download(&self, path: &str) -> StoreResult<Vec<u8>> {
        let full = self.resolve(path)?;
        match fs::read(&full).await {
            Ok(bytes) => {
                debug!(path, bytes = bytes.len(), "blob downloaded");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobNotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Turns a hosted-storage download URL into a bucket-relative object path.
///
/// `https://host/v0/b/bucket/o/uploads%2Fc1%2Freport.pdf?alt=media&token=t`
/// becomes `uploads/c1/report.pdf`. Inputs without an `/o/` segment are
/// treated as a path already; only the query string is removed.
pub fn blob_path_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let encoded = match without_query.split_once("/o/") {
        Some((_, object)) => object,
        None => without_query,
    };
    urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| encoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn object_path_from_download_url() {
        assert_eq!(
            blob_path_from_url(
                "https://storage.example.com/v0/b/app.appspot.com/o/uploads%2Fc1%2Freport%20may.pdf?alt=media&token=abc"
            ),
            "uploads/c1/report may.pdf"
        );
        assert_eq!(blob_path_from_url("uploads/c1/r.json?x=1"), "uploads/c1/r.json");
    }

    #[tokio::test]
    async fn downloads_and_guards_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        std::fs::write(dir.path().join("uploads/r.txt"), b"hello").unwrap();

        let blobs = LocalBlobStore::new(dir.path());
        assert_eq!(blobs.download("uploads/r.txt").await.unwrap(), b"hello");
        assert!(matches!(
            blobs.download("uploads/missing.pdf").await,
            Err(StoreError::BlobNotFound(_))
        ));
        assert!(matches!(
            blobs.download("../secret").await,
            Err(StoreError::InvalidDocument(_))
        ));
    }
}
