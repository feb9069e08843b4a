//! Pending remote side effects of an edit session
//!
//! Moves are folder relocations for an out-of-band mover; deletes are
//! executed by the committer. A move is keyed by its file and origin folder,
//! so moving a photo twice rewrites one entry instead of appending.

use crate::catalog::Photo;
use serde::{Deserialize, Serialize};

/// `from/file` should end up at `to/file`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEntry {
    pub file: String,
    pub from: String,
    pub to: String,
}

impl MoveEntry {
    pub fn new(file: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// Path the entry moves away from
    pub fn source_path(&self) -> String {
        join(&self.from, &self.file)
    }
}

/// Fold `incoming` moves into an already published list.
///
/// An incoming move that continues an existing one (same file, starting
/// where the existing entry ends) extends it; net no-ops are dropped.
pub fn merge_moves(existing: Vec<MoveEntry>, incoming: &[MoveEntry]) -> Vec<MoveEntry> {
    let mut merged = existing;

    for entry in incoming {
        let continues = merged
            .iter_mut()
            .find(|m| m.file == entry.file && (m.to == entry.from || m.from == entry.from));
        match continues {
            Some(m) => m.to = entry.to.clone(),
            None => merged.push(entry.clone()),
        }
    }

    merged.retain(|m| !m.is_noop());
    merged
}

/// Staged deletion of both files of a photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEntry {
    pub source_path: String,
    pub grid_path: String,
}

impl From<&Photo> for DeleteEntry {
    fn from(photo: &Photo) -> Self {
        Self {
            source_path: photo.source_path.clone(),
            grid_path: photo.grid_path.clone(),
        }
    }
}

/// Moves and deletes not yet applied remotely
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingJournal {
    moves: Vec<MoveEntry>,
    deletes: Vec<DeleteEntry>,
}

impl PendingJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves(&self) -> &[MoveEntry] {
        &self.moves
    }

    pub fn deletes(&self) -> &[DeleteEntry] {
        &self.deletes
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.deletes.is_empty()
    }

    /// Record that `from/file` now belongs in `to`
    pub fn record_move(&mut self, file: &str, from: &str, to: &str) {
        if let Some(pos) = self.moves.iter().position(|m| m.file == file && m.from == from) {
            self.moves[pos].to = to.to_string();
            if self.moves[pos].is_noop() {
                tracing::debug!("Move of {}/{} cancelled out", from, file);
                self.moves.remove(pos);
            }
            return;
        }

        if from != to {
            self.moves.push(MoveEntry::new(file, from, to));
        }
    }

    /// Stage a delete; drops any pending move of the same file
    pub fn record_delete(&mut self, photo: &Photo) {
        self.moves.retain(|m| m.source_path() != photo.source_path);
        if !self.is_staged_delete(&photo.source_path) {
            self.deletes.push(DeleteEntry::from(photo));
        }
    }

    pub fn is_staged_delete(&self, source_path: &str) -> bool {
        self.deletes.iter().any(|d| d.source_path == source_path)
    }

    pub fn pending_move(&self, source_path: &str) -> Option<&MoveEntry> {
        self.moves.iter().find(|m| m.source_path() == source_path)
    }

    pub fn clear_moves(&mut self) {
        self.moves.clear();
    }

    pub fn clear_deletes(&mut self) {
        self.deletes.clear();
    }

    pub fn clear(&mut self) {
        self.moves.clear();
        self.deletes.clear();
    }
}

fn join(folder: &str, file: &str) -> String {
    if folder.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", folder, file)
    }
}
