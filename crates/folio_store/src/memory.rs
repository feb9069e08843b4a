//! In-memory backend with failure injection

use crate::{
    validate_path, ContentStore, DeleteOutcome, RemoteFile, Result, StoreError, VersionTag,
    WriteOutcome,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// How an injected failure manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// 500-class API error
    ServerError,
    /// 401: credential rejected
    Unauthorized,
}

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<String, (Vec<u8>, u64)>,
    next_version: u64,
    failures: HashMap<String, FailureMode>,
    calls: Vec<String>,
}

/// Content store held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording a call
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) -> VersionTag {
        let mut inner = self.inner.lock();
        inner.next_version += 1;
        let version = inner.next_version;
        inner.files.insert(path.to_string(), (content.into(), version));
        VersionTag(version.to_string())
    }

    /// Make every call touching `path` fail
    pub fn fail_on(&self, path: &str, mode: FailureMode) {
        self.inner.lock().failures.insert(path.to_string(), mode);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().failures.clear();
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.lock().files.contains_key(path)
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().files.get(path).map(|(c, _)| c.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.inner.lock().files.keys().cloned().collect()
    }

    /// Log of calls as `"op path"` strings, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    fn enter(&self, op: &str, path: &str) -> Result<()> {
        validate_path(path)?;
        let mut inner = self.inner.lock();
        inner.calls.push(format!("{} {}", op, path));
        match inner.failures.get(path) {
            Some(FailureMode::Unauthorized) => Err(StoreError::Unauthorized),
            Some(FailureMode::ServerError) => Err(StoreError::Api {
                status: 500,
                path: path.to_string(),
                message: "injected failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch(&self, path: &str) -> Result<Option<RemoteFile>> {
        self.enter("fetch", path)?;
        let inner = self.inner.lock();
        Ok(inner.files.get(path).map(|(content, version)| RemoteFile {
            content: content.clone(),
            version: VersionTag(version.to_string()),
        }))
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&VersionTag>,
        _message: &str,
    ) -> Result<WriteOutcome> {
        self.enter("write", path)?;
        let mut inner = self.inner.lock();

        let current = inner.files.get(path).map(|(_, v)| VersionTag(v.to_string()));
        if current.as_ref() != expected {
            return Ok(WriteOutcome::Conflict { current });
        }

        inner.next_version += 1;
        let version = inner.next_version;
        inner.files.insert(path.to_string(), (content.to_vec(), version));
        Ok(WriteOutcome::Written(VersionTag(version.to_string())))
    }

    async fn delete(&self, path: &str, _message: &str) -> Result<DeleteOutcome> {
        self.enter("delete", path)?;
        let mut inner = self.inner.lock();
        Ok(match inner.files.remove(path) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::AlreadyAbsent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_conditional_write() {
        let store = MemoryStore::new();
        let v1 = store.insert("order.json", "{}");

        let stale = VersionTag::new("999");
        let out = store.write("order.json", b"[]", Some(&stale), "m").await.unwrap();
        assert_eq!(out, WriteOutcome::Conflict { current: Some(v1.clone()) });

        let out = store.write("order.json", b"[]", Some(&v1), "m").await.unwrap();
        assert!(matches!(out, WriteOutcome::Written(_)));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryStore::new();
        store.fail_on("photos.json", FailureMode::Unauthorized);
        let err = store.fetch("photos.json").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(store.calls(), vec!["fetch photos.json".to_string()]);

        store.clear_failures();
        assert!(store.fetch("photos.json").await.unwrap().is_none());
    }
}
