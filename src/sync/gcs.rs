use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::SyncError;

use super::SnapshotStore;

const GCS_BASE: &str = "https://storage.googleapis.com";

/// Google Cloud Storage bucket holding the database snapshot under a fixed
/// object key. Uses the JSON/media endpoints; the bearer token is optional
/// for public buckets.
pub struct GcsBucket {
    bucket: String,
    object: String,
    token: Option<String>,
    client: Client,
}

impl GcsBucket {
    pub fn new(bucket: String, object: String, token: Option<String>) -> Self {
        GcsBucket {
            bucket,
            object,
            token,
            client: Client::new(),
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl SnapshotStore for GcsBucket {
    async fn fetch(&self, dest: &Path) -> Result<(), SyncError> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            GCS_BASE,
            self.bucket,
            urlencoding::encode(&self.object)
        );

        let resp = self.authorize(self.client.get(&url)).send().await?;
        if !resp.status().is_success() {
            return Err(SyncError::RemoteStatus {
                status: resp.status().as_u16(),
                object: self.object.clone(),
            });
        }

        let bytes = resp.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        tracing::debug!(bucket = %self.bucket, object = %self.object, size = bytes.len(), "fetched snapshot");

        Ok(())
    }

    async fn push(&self, src: &Path) -> Result<(), SyncError> {
        let bytes = tokio::fs::read(src).await?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            GCS_BASE,
            self.bucket,
            urlencoding::encode(&self.object)
        );

        let resp = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SyncError::RemoteStatus {
                status: resp.status().as_u16(),
                object: self.object.clone(),
            });
        }

        tracing::debug!(bucket = %self.bucket, object = %self.object, "pushed snapshot");
        Ok(())
    }
}
