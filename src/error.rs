use thiserror::Error;

/// Storage-layer errors. Insufficient history for a moving-average window is
/// not an error; those fields are simply left unset.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed condition data for {stock_id}: {reason}")]
    MalformedConditionData { stock_id: String, reason: String },
}

/// Snapshot synchronization errors. Fetch and push are all-or-nothing; a
/// failed push leaves the local database file in place.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote returned status {status} for object {object}")]
    RemoteStatus { status: u16, object: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
