//! # History Store
//! Append-only JSONL archive of snapshots, one entry per line, keyed by
//! generation timestamp. Writers are serialized behind an async mutex so
//! overlapping scheduled runs cannot interleave bytes; readers never take
//! the lock and never observe a partial entry, because an entry only
//! becomes visible once its full line (newline included) has been written.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::snapshot::Snapshot;

/// How long an append waits on a stuck sibling writer before giving up.
const WRITER_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage write conflict: {detail}")]
    WriteConflict { detail: String },
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryEntry {
    id: String,
    generated_at: DateTime<Utc>,
    snapshot: Snapshot,
}

pub struct HistoryStore {
    path: PathBuf,
    writer: tokio::sync::Mutex<()>,
}

impl HistoryStore {
    /// Open (or create the parent directory for) a store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            writer: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one snapshot and return its entry id. At most one writer is
    /// active at a time; a writer that cannot get the lock within
    /// `WRITER_WAIT` reports a conflict instead of queueing forever.
    pub async fn append(&self, snapshot: &Snapshot) -> Result<String, StoreError> {
        let entry = HistoryEntry {
            id: snapshot.digest(),
            generated_at: snapshot.generated_at,
            snapshot: snapshot.clone(),
        };
        let mut line = serde_json::to_string(&entry).map_err(|e| StoreError::WriteConflict {
            detail: format!("serializing entry: {e}"),
        })?;
        line.push('\n');

        let _guard = tokio::time::timeout(WRITER_WAIT, self.writer.lock())
            .await
            .map_err(|_| StoreError::WriteConflict {
                detail: format!(
                    "another writer held the store lock for over {}s",
                    WRITER_WAIT.as_secs()
                ),
            })?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(entry.id)
    }

    /// Latest snapshot generated at or before `t`, if any. Malformed lines
    /// (an interrupted writer's torn tail) are skipped with a warning.
    pub async fn latest_before(
        &self,
        t: DateTime<Utc>,
    ) -> Result<Option<Snapshot>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut best: Option<HistoryEntry> = None;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: HistoryEntry = match serde_json::from_str(line) {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed history line");
                    continue;
                }
            };
            if entry.generated_at > t {
                continue;
            }
            let newer = best
                .as_ref()
                .map(|b| entry.generated_at > b.generated_at)
                .unwrap_or(true);
            if newer {
                best = Some(entry);
            }
        }
        Ok(best.map(|e| e.snapshot))
    }

    /// Latest snapshot overall.
    pub async fn latest(&self) -> Result<Option<Snapshot>, StoreError> {
        self.latest_before(DateTime::<Utc>::MAX_UTC).await
    }

    /// Number of parseable entries. Diagnostic only.
    pub async fn len(&self) -> Result<usize, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter(|l| serde_json::from_str::<HistoryEntry>(l).is_ok())
            .count())
    }
}
