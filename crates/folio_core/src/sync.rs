//! Commit of an edit session to the remote store
//!
//! Steps, in order: manifest, ordering index, move journal (merged into the
//! published one), then deletes. The sequence is not transactional: a
//! failure part-way leaves earlier steps applied and the rest pending in the
//! journal, and retrying the commit resumes from there.

use crate::catalog::MediaCatalog;
use crate::config::StoreConfig;
use crate::error::{FolioError, RemoteOp, Result};
use crate::journal::{merge_moves, PendingJournal};
use crate::manifest::{decode_moves, encode_moves, OrderIndex, PhotoManifest};
use folio_store::{ContentStore, DeleteOutcome, VersionTag, WriteOutcome};

/// What a successful commit did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Paths of artifacts written
    pub artifacts_written: Vec<String>,
    /// Entries in the published move journal
    pub moves_written: usize,
    /// Remote files removed (already-absent ones included)
    pub files_deleted: usize,
}

/// Artifacts a commit would write, for dry runs
#[derive(Debug, Clone)]
pub struct CommitPreview {
    pub manifest: Vec<u8>,
    pub order: Vec<u8>,
    /// Local moves only; the published journal is not consulted
    pub moves: Option<Vec<u8>>,
    pub deletes: Vec<String>,
}

/// Artifacts a commit would write, without touching the store
pub fn commit_preview(catalog: &MediaCatalog, journal: &PendingJournal) -> Result<CommitPreview> {
    let moves = if journal.moves().is_empty() {
        None
    } else {
        Some(encode_moves(journal.moves())?)
    };

    Ok(CommitPreview {
        manifest: PhotoManifest::from_catalog(catalog).to_json()?,
        order: OrderIndex::from_catalog(catalog).to_json()?,
        moves,
        deletes: journal
            .deletes()
            .iter()
            .flat_map(|d| [d.source_path.clone(), d.grid_path.clone()])
            .collect(),
    })
}

pub struct RemoteSyncCommitter<'a> {
    store: &'a dyn ContentStore,
    config: &'a StoreConfig,
}

impl<'a> RemoteSyncCommitter<'a> {
    pub fn new(store: &'a dyn ContentStore, config: &'a StoreConfig) -> Self {
        Self { store, config }
    }

    pub async fn commit(&self, catalog: &MediaCatalog, journal: &mut PendingJournal) -> Result<CommitReport> {
        let mut report = CommitReport::default();

        let manifest = PhotoManifest::from_catalog(catalog).to_json()?;
        self.write_artifact(&self.config.manifest_path, &manifest, "Update photo manifest")
            .await?;
        report.artifacts_written.push(self.config.manifest_path.clone());

        let order = OrderIndex::from_catalog(catalog).to_json()?;
        self.write_artifact(&self.config.order_path, &order, "Update photo order")
            .await?;
        report.artifacts_written.push(self.config.order_path.clone());

        if !journal.moves().is_empty() {
            report.moves_written = self.publish_moves(journal).await?;
            report.artifacts_written.push(self.config.moves_path.clone());
            journal.clear_moves();
        }

        for entry in journal.deletes() {
            for path in [&entry.source_path, &entry.grid_path] {
                self.delete_file(path).await?;
                report.files_deleted += 1;
            }
        }
        journal.clear_deletes();

        tracing::info!(
            "Commit done: {} artifacts, {} moves, {} files deleted",
            report.artifacts_written.len(),
            report.moves_written,
            report.files_deleted
        );
        Ok(report)
    }

    /// Merge local moves into the published journal and write it back
    async fn publish_moves(&self, journal: &PendingJournal) -> Result<usize> {
        let path = &self.config.moves_path;
        let current = self
            .store
            .fetch(path)
            .await
            .map_err(|e| FolioError::remote(RemoteOp::Fetch(path.clone()), e))?;

        let (existing, version) = match current {
            Some(file) => (decode_moves(&file.content)?, Some(file.version)),
            None => (Vec::new(), None),
        };

        let merged = merge_moves(existing, journal.moves());
        let bytes = encode_moves(&merged)?;
        self.conditional_write(path, &bytes, version.as_ref(), "Record pending photo moves")
            .await?;

        tracing::debug!("Published {} moves", merged.len());
        Ok(merged.len())
    }

    /// Read-modify-write: take the current version, then write against it
    async fn write_artifact(&self, path: &str, content: &[u8], message: &str) -> Result<()> {
        let version = self
            .store
            .version_of(path)
            .await
            .map_err(|e| FolioError::remote(RemoteOp::Fetch(path.to_string()), e))?;

        self.conditional_write(path, content, version.as_ref(), message).await
    }

    async fn conditional_write(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&VersionTag>,
        message: &str,
    ) -> Result<()> {
        let outcome = self
            .store
            .write(path, content, expected, message)
            .await
            .map_err(|e| FolioError::remote(RemoteOp::Write(path.to_string()), e))?;

        match outcome {
            WriteOutcome::Written(version) => {
                tracing::debug!("Wrote {} ({})", path, version);
                Ok(())
            }
            WriteOutcome::Conflict { .. } => {
                tracing::warn!("Version conflict writing {}", path);
                Err(FolioError::Conflict(RemoteOp::Write(path.to_string())))
            }
        }
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let outcome = self
            .store
            .delete(path, &format!("Delete {}", path))
            .await
            .map_err(|e| FolioError::remote(RemoteOp::Delete(path.to_string()), e))?;

        if outcome == DeleteOutcome::AlreadyAbsent {
            tracing::debug!("{} was already gone", path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Album, Photo};
    use crate::journal::MoveEntry;
    use folio_store::{FailureMode, MemoryStore};

    fn catalog() -> MediaCatalog {
        MediaCatalog::from_albums(vec![Album {
            slug: "trips".into(),
            photos: vec![
                Photo::new("photos/trips/002.jpg", "photos/trips/grid/002.jpg", 10, 10),
                Photo::new("photos/trips/001.jpg", "photos/trips/grid/001.jpg", 10, 10),
            ],
        }])
    }

    #[tokio::test]
    async fn test_commit_writes_artifacts() {
        let store = MemoryStore::new();
        store.insert("photos.json", b"{}");
        let config = StoreConfig::default();
        let mut journal = PendingJournal::new();

        let report = RemoteSyncCommitter::new(&store, &config)
            .commit(&catalog(), &mut journal)
            .await
            .unwrap();

        assert_eq!(report.artifacts_written, ["photos.json", "order.json"]);
        assert!(!store.contains("moves.json"));

        let order: serde_json::Value = serde_json::from_slice(&store.content("order.json").unwrap()).unwrap();
        assert_eq!(order["trips"], serde_json::json!(["002", "001"]));
        let manifest = PhotoManifest::from_json(&store.content("photos.json").unwrap()).unwrap();
        assert_eq!(manifest.into_catalog().unwrap(), catalog());
    }

    #[tokio::test]
    async fn test_moves_merged_and_cleared() {
        let store = MemoryStore::new();
        store.insert(
            "moves.json",
            encode_moves(&[MoveEntry::new("009.jpg", "photos/a", "photos/b")]).unwrap(),
        );
        let config = StoreConfig::default();
        let mut journal = PendingJournal::new();
        journal.record_move("009.jpg", "photos/b", "photos/c");
        journal.record_move("010.jpg", "photos/a", "photos/trips");

        let report = RemoteSyncCommitter::new(&store, &config)
            .commit(&catalog(), &mut journal)
            .await
            .unwrap();

        assert_eq!(report.moves_written, 2);
        assert!(journal.moves().is_empty());
        let published = decode_moves(&store.content("moves.json").unwrap()).unwrap();
        assert_eq!(
            published,
            [
                MoveEntry::new("009.jpg", "photos/a", "photos/c"),
                MoveEntry::new("010.jpg", "photos/a", "photos/trips"),
            ]
        );
    }

    #[tokio::test]
    async fn test_deletes_run_last_and_tolerate_absence() {
        let store = MemoryStore::new();
        store.insert("photos/trips/003.jpg", b"full");
        let config = StoreConfig::default();
        let mut journal = PendingJournal::new();
        journal.record_delete(&Photo::new("photos/trips/003.jpg", "photos/trips/grid/003.jpg", 1, 1));

        let report = RemoteSyncCommitter::new(&store, &config)
            .commit(&catalog(), &mut journal)
            .await
            .unwrap();

        assert_eq!(report.files_deleted, 2);
        assert!(!store.contains("photos/trips/003.jpg"));
        assert!(journal.is_empty());

        let calls = store.calls();
        let last_write = calls.iter().rposition(|c| c.starts_with("write")).unwrap();
        let first_delete = calls.iter().position(|c| c.starts_with("delete")).unwrap();
        assert!(last_write < first_delete);
    }

    #[tokio::test]
    async fn test_failure_keeps_journal() {
        let store = MemoryStore::new();
        store.fail_on("photos/trips/grid/003.jpg", FailureMode::ServerError);
        let config = StoreConfig::default();
        let mut journal = PendingJournal::new();
        journal.record_move("010.jpg", "photos/a", "photos/trips");
        journal.record_delete(&Photo::new("photos/trips/003.jpg", "photos/trips/grid/003.jpg", 1, 1));

        let err = RemoteSyncCommitter::new(&store, &config)
            .commit(&catalog(), &mut journal)
            .await
            .unwrap_err();

        assert!(matches!(&err, FolioError::Remote { op: RemoteOp::Delete(p), .. } if p == "photos/trips/grid/003.jpg"));
        // Moves were published before the failure; deletes stay staged for a retry
        assert!(journal.moves().is_empty());
        assert_eq!(journal.deletes().len(), 1);

        store.clear_failures();
        RemoteSyncCommitter::new(&store, &config)
            .commit(&catalog(), &mut journal)
            .await
            .unwrap();
        assert!(journal.is_empty());
    }

    #[tokio::test]
    async fn test_preview_lists_everything() {
        let store = MemoryStore::new();
        let mut journal = PendingJournal::new();
        journal.record_delete(&Photo::new("photos/1.jpg", "photos/grid/1.jpg", 1, 1));

        let preview = commit_preview(&catalog(), &journal).unwrap();
        assert!(preview.moves.is_none());
        assert_eq!(preview.deletes, ["photos/1.jpg", "photos/grid/1.jpg"]);
        assert!(String::from_utf8(preview.manifest).unwrap().contains("\"trips\""));
        assert!(store.calls().is_empty());
    }
}
