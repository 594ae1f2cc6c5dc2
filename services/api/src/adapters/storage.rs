//! services/api/src/adapters/storage.rs
//!
//! Stores uploaded course files on the local filesystem and serves them under
//! a configured public URL prefix.

use async_trait::async_trait;
use kazusa_core::ports::{FileStorage, PortError, PortResult};
use std::path::{Component, Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

/// Filesystem-backed `FileStorage`. Keys are flat: `<uuid>_<sanitized name>`.
pub struct LocalFileStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn key_for(filename: &str) -> String {
        format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(filename))
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Maps a public URL back to a path under `base_path`. Rejects foreign
    /// prefixes and any key that would leave the storage directory.
    fn path_for(&self, url: &str) -> PortResult<PathBuf> {
        let key = url
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| PortError::InvalidFilter(format!("{url} is not a stored file")))?;
        let escapes = Path::new(key)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(PortError::InvalidFilter(format!(
                "{url} is not a stored file"
            )));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn put(&self, filename: &str, data: Vec<u8>) -> PortResult<String> {
        let key = Self::key_for(filename);
        let path = self.base_path.join(&key);

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| PortError::Storage(format!("create upload dir: {e}")))?;
        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| PortError::Storage(format!("create {key}: {e}")))?;
        file.write_all(&data)
            .await
            .map_err(|e| PortError::Storage(format!("write {key}: {e}")))?;
        file.flush()
            .await
            .map_err(|e| PortError::Storage(format!("flush {key}: {e}")))?;

        debug!(key = %key, size = data.len(), "file stored");
        Ok(self.url_for(&key))
    }

    async fn delete(&self, url: &str) -> PortResult<()> {
        let path = self.path_for(url)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(url = %url, "file deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(url = %url, "file not found for deletion");
                Ok(())
            }
            Err(e) => Err(PortError::Storage(format!("delete {url}: {e}"))),
        }
    }
}

impl std::fmt::Debug for LocalFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileStorage")
            .field("base_path", &self.base_path)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Keeps the final path segment and replaces anything outside `[A-Za-z0-9._-]`.
fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .take(200)
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
