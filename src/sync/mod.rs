//! Whole-file snapshot synchronization of the database with a remote object
//! store. Fetch happens before the database session, push after it; partial
//! sync is never applied.

mod gcs;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::database::Database;
use crate::error::SyncError;

pub use gcs::GcsBucket;

/// A remote home for the database file snapshot. Both operations are
/// all-or-nothing: on failure the destination must be treated as unchanged.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn fetch(&self, dest: &Path) -> Result<(), SyncError>;
    async fn push(&self, src: &Path) -> Result<(), SyncError>;
}

/// One unit of work against the database: open (fetching the snapshot first
/// when the local file is missing), operate, close (pushing the snapshot back
/// when anything was written).
pub struct Session {
    db: Database,
    db_path: PathBuf,
    remote: Option<Box<dyn SnapshotStore>>,
    fetched_from_remote: bool,
}

impl Session {
    pub async fn open(
        db_path: &Path,
        remote: Option<Box<dyn SnapshotStore>>,
    ) -> Result<Self, SyncError> {
        let mut fetched_from_remote = false;

        if !db_path.exists() {
            if let Some(store) = remote.as_deref() {
                store.fetch(db_path).await?;
                tracing::info!(path = %db_path.display(), "downloaded database snapshot");
                fetched_from_remote = true;
            }
        }

        let db = Database::open(db_path)?;

        Ok(Session {
            db,
            db_path: db_path.to_path_buf(),
            remote,
            fetched_from_remote,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Close the session. When the database was modified and the snapshot
    /// came from the remote, the file is uploaded and then removed locally.
    /// A failed upload keeps the local file so nothing is lost.
    pub async fn close(self) -> Result<(), SyncError> {
        let Session {
            db,
            db_path,
            remote,
            fetched_from_remote,
        } = self;

        let modified = db.is_modified();
        drop(db);

        if modified && fetched_from_remote {
            if let Some(store) = remote.as_deref() {
                store.push(&db_path).await?;
                tracing::info!(path = %db_path.display(), "uploaded database snapshot");
                std::fs::remove_file(&db_path)?;
            }
        }

        Ok(())
    }
}
