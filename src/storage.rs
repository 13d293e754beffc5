use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

/// Blob storage seam for uploaded movie images.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    /// Path under which the object is served, e.g. `uploads/<key>`.
    fn public_url(&self, key: &str) -> String;
}

/// Disk-backed storage; files land in the configured upload directory and
/// are served statically from `/uploads`.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self { root })
    }

    fn object_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        // Keys are flat file names; anything that could escape the root is refused.
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            anyhow::bail!("invalid object key: {key}");
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        let path = self.object_path(key)?;
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.object_path(key)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove {}", path.display()))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("uploads/{key}")
    }
}
