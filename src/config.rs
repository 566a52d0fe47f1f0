use std::env;
use std::path::PathBuf;

use crate::sync::{GcsBucket, SnapshotStore};

const DEFAULT_DB_PATH: &str = "stockdata.db";
const DEFAULT_OBJECT_KEY: &str = "stockdata.db";

/// Runtime settings, read from the environment with defaults. Only the
/// storage file location and the remote bucket affect core behavior.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub bucket: Option<String>,
    pub object_key: String,
    pub access_token: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Settings {
            db_path: PathBuf::from(
                env::var("DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            ),
            bucket: env::var("BUCKET_NAME").ok().filter(|s| !s.is_empty()),
            object_key: env::var("SNAPSHOT_OBJECT")
                .unwrap_or_else(|_| DEFAULT_OBJECT_KEY.to_string()),
            access_token: env::var("GCS_ACCESS_TOKEN").ok().filter(|s| !s.is_empty()),
        }
    }

    /// Remote snapshot store, if a bucket is configured.
    pub fn snapshot_store(&self) -> Option<Box<dyn SnapshotStore>> {
        self.bucket.as_ref().map(|bucket| {
            Box::new(GcsBucket::new(
                bucket.clone(),
                self.object_key.clone(),
                self.access_token.clone(),
            )) as Box<dyn SnapshotStore>
        })
    }
}
