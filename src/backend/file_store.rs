use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::debug;

use super::ObjectStore;

/// Object storage backed by a directory tree. Object paths map to files
/// under `root`; public URLs are `file://` URLs.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create object store at {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let is_plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if path.is_empty() || !is_plain {
            bail!("invalid object path '{path}'");
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        debug!("Storing {} ({} bytes, {content_type})", path, bytes.len());
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("failed to write object {}", target.display()))
    }

    fn public_url(&self, path: &str) -> String {
        format!("file://{}", self.root.join(path).display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("evidence")).unwrap();

        store
            .upload("ana/s1_0.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();

        let written = std::fs::read(store.root().join("ana/s1_0.jpg")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
        assert!(store.public_url("ana/s1_0.jpg").starts_with("file://"));
    }

    #[tokio::test]
    async fn rejects_paths_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        for bad in ["../outside.jpg", "/etc/passwd", ""] {
            assert!(store.upload(bad, vec![0], "image/jpeg").await.is_err());
        }
    }
}
