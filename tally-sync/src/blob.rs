//! Blob-storage seam for receipt PDFs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Store bytes under a path; returns the stored path.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;

    /// Paths under a prefix, sorted by name.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn public_url(&self, path: &str) -> String;
}

/// In-memory blob store for tests.
#[derive(Debug, Default)]
pub struct MemoryBlob {
    blobs: RwLock<HashMap<String, Blob>>,
}

#[derive(Debug, Clone)]
struct Blob {
    content_type: String,
    bytes: Vec<u8>,
}

impl MemoryBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored content type, if the blob exists.
    pub async fn content_type(&self, path: &str) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(path)
            .map(|blob| blob.content_type.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlob {
    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .read()
            .await
            .get(path)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| StoreError::BlobNotFound {
                path: path.to_string(),
            })
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        self.blobs.write().await.insert(
            path.to_string(),
            Blob {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(path.to_string())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self
            .blobs
            .read()
            .await
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_download_roundtrip() {
        let blobs = MemoryBlob::new();
        blobs
            .upload("invoices/a.pdf", vec![1, 2, 3], "application/pdf")
            .await
            .unwrap();
        assert_eq!(blobs.download("invoices/a.pdf").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(
            blobs.content_type("invoices/a.pdf").await.as_deref(),
            Some("application/pdf")
        );
        assert!(matches!(
            blobs.download("invoices/missing.pdf").await,
            Err(StoreError::BlobNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let blobs = MemoryBlob::new();
        for name in ["invoices/a.pdf", "invoices/b.pdf", "exports/c.csv"] {
            blobs.upload(name, Vec::new(), "application/pdf").await.unwrap();
        }
        assert_eq!(
            blobs.list("invoices/").await.unwrap(),
            vec!["invoices/a.pdf".to_string(), "invoices/b.pdf".to_string()]
        );
        assert_eq!(blobs.public_url("invoices/a.pdf"), "memory://invoices/a.pdf");
    }
}
