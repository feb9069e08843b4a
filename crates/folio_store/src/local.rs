//! Local directory backend
//!
//! Mirrors the remote layout under a root directory. Version tags are xxh3
//! hashes of the file content, so a concurrent edit by another process is
//! still detected as a conflict.

use crate::{
    validate_path, ContentStore, DeleteOutcome, RemoteFile, Result, VersionTag, WriteOutcome,
};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// Content store rooted at a local directory
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }

    fn version_for(content: &[u8]) -> VersionTag {
        VersionTag(format!("{:016x}", xxh3_64(content)))
    }
}

#[async_trait]
impl ContentStore for LocalDirStore {
    async fn fetch(&self, path: &str) -> Result<Option<RemoteFile>> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(content) => {
                let version = Self::version_for(&content);
                Ok(Some(RemoteFile { content, version }))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&VersionTag>,
        _message: &str,
    ) -> Result<WriteOutcome> {
        let full = self.resolve(path)?;
        let current = self.version_of(path).await?;
        if current.as_ref() != expected {
            tracing::warn!("write {}: expected {:?}, found {:?}", path, expected, current);
            return Ok(WriteOutcome::Conflict { current });
        }

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, content).await?;

        tracing::debug!("write {}: {} bytes", path, content.len());
        Ok(WriteOutcome::Written(Self::version_for(content)))
    }

    async fn delete(&self, path: &str, _message: &str) -> Result<DeleteOutcome> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());

        assert!(store.fetch("photos.json").await.unwrap().is_none());

        let v1 = match store.write("photos.json", b"{}", None, "init").await.unwrap() {
            WriteOutcome::Written(v) => v,
            other => panic!("unexpected {:?}", other),
        };

        // Creating again without a version conflicts
        let again = store.write("photos.json", b"[]", None, "init").await.unwrap();
        assert_eq!(again, WriteOutcome::Conflict { current: Some(v1.clone()) });

        let out = store.write("photos.json", b"[]", Some(&v1), "update").await.unwrap();
        assert!(matches!(out, WriteOutcome::Written(_)));
        assert_eq!(store.fetch("photos.json").await.unwrap().unwrap().content, b"[]");
    }

    #[tokio::test]
    async fn test_nested_write_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());

        store.write("photos/grid/001.jpg", b"x", None, "upload").await.unwrap();
        assert!(dir.path().join("photos/grid/001.jpg").exists());

        assert_eq!(store.delete("photos/grid/001.jpg", "rm").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(
            store.delete("photos/grid/001.jpg", "rm").await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
    }
}
