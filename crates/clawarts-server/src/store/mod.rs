//! Transactional in-memory store
//!
//! All tables live behind one [`RwLock`]. A write takes a [`Checkpoint`] of
//! the rewritable tables and the lengths of the append-only logs (funding,
//! spells, votes), runs the closure in place, and restores the checkpoint
//! when the closure returns `Err` or the snapshot cannot be written. A failed
//! write leaves nothing behind, which is what makes settlement all-or-nothing.
//!
//! Cost per write: the append logs are never copied, but every other table
//! is cloned once, and with a snapshot file configured the whole state is
//! rewritten to disk. Write closures must not panic; money arithmetic goes
//! through checked operations for that reason.

mod snapshot;
mod tables;

pub use tables::{AppendLog, Tables};

use snapshot::Snapshot;
use tables::Checkpoint;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clawarts_core::CoreResult;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::AppResult;

#[derive(Clone)]
pub struct Store {
    tables: Arc<RwLock<Tables>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub rounds: usize,
    pub ideas: usize,
    pub funding_records: usize,
    pub participants: usize,
    pub projects: usize,
    pub persistent: bool,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            snapshot_path: None,
        }
    }

    /// Open a store backed by a JSON snapshot, loading it when present
    pub async fn open(snapshot_path: Option<PathBuf>) -> AppResult<Self> {
        let Some(path) = snapshot_path else {
            tracing::info!("Store running in memory only");
            return Ok(Self::in_memory());
        };

        let tables = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                let tables = Tables::from(snapshot);
                tracing::info!(
                    path = %path.display(),
                    rounds = %tables.rounds.len(),
                    projects = %tables.projects.len(),
                    "Loaded store snapshot"
                );
                tables
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No snapshot yet, starting empty");
                Tables::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
            snapshot_path: Some(Arc::new(path)),
        })
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let tables = self.tables.read().await;
        f(&tables)
    }

    /// Run `f` as one transaction
    pub async fn write<R>(&self, f: impl FnOnce(&mut Tables) -> CoreResult<R>) -> AppResult<R> {
        let start = Instant::now();
        let mut tables = self.tables.write().await;
        let checkpoint: Checkpoint = tables.checkpoint();

        let result = match f(&mut *tables) {
            Ok(result) => result,
            Err(e) => {
                tables.restore(checkpoint);
                tracing::debug!(error = %e, "Transaction rolled back");
                return Err(e.into());
            }
        };

        if let Some(path) = &self.snapshot_path {
            if let Err(e) = persist(path, &*tables).await {
                tables.restore(checkpoint);
                tracing::error!(path = %path.display(), error = %e, "Snapshot write failed, transaction rolled back");
                return Err(e);
            }
        }

        tracing::debug!(duration_ms = %start.elapsed().as_millis(), "Transaction committed");
        Ok(result)
    }

    pub async fn stats(&self) -> StoreStats {
        let persistent = self.snapshot_path.is_some();
        self.read(|t| StoreStats {
            rounds: t.rounds.len(),
            ideas: t.ideas.len(),
            funding_records: t.funding.len(),
            participants: t.participants.len(),
            projects: t.projects.len(),
            persistent,
        })
        .await
    }
}

async fn persist(path: &Path, tables: &Tables) -> AppResult<()> {
    let bytes = serde_json::to_vec(&Snapshot::from(tables))?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
