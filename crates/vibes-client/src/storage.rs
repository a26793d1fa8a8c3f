use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Bucketed object storage.
#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Store `data` at `bucket/path`, returning the stored path.
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> Result<String>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Objects stored as plain files at `{root}/{bucket}/{path}`.
pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalStorage {
    pub async fn new(root: PathBuf, base_url: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        info!("Object storage directory: {}", root.display());
        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// On-disk location of an object. Rejects anything that could escape the root.
    pub fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(path);
        if bucket.is_empty()
            || path.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            bail!("Invalid object path: {}/{}", bucket, path);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> Result<String> {
        let file_path = self.object_path(bucket, path)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        info!("Stored {}/{} ({} bytes)", bucket, path, data.len());
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, bucket, path)
    }
}
