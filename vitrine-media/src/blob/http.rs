use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::error::{CleanupError, Result};

use super::{BlobStore, DeleteOutcome};

/// Blob-storage provider adapter speaking the provider's REST delete API
/// (`DELETE {base}/objects/{blob_object_id}` with a bearer token).
#[derive(Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for HttpBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBlobStore")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl HttpBlobStore {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(CleanupError::InvalidEndpoint(
                base_url.as_str().to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CleanupError::BlobStore(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn object_url(&self, blob_object_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                CleanupError::InvalidEndpoint(
                    self.base_url.as_str().to_string(),
                )
            })?
            .extend(["objects", blob_object_id]);
        Ok(url)
    }
}

/// Fold an HTTP response status into a delete outcome.
///
/// 404 is success (the object is already gone); 408/429/5xx are transient;
/// every other non-success status will not change on retry.
fn classify_status(status: StatusCode) -> DeleteOutcome {
    if status.is_success() {
        return DeleteOutcome::Deleted;
    }
    match status {
        StatusCode::NOT_FOUND => DeleteOutcome::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            DeleteOutcome::Retriable(format!("provider returned {status}"))
        }
        s if s.is_server_error() => {
            DeleteOutcome::Retriable(format!("provider returned {status}"))
        }
        s => DeleteOutcome::Permanent(format!("provider returned {s}")),
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn delete(&self, blob_object_id: &str) -> Result<DeleteOutcome> {
        let url = self.object_url(blob_object_id)?;
        debug!(blob_object_id, "issuing blob delete");

        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        let outcome = match response {
            Ok(response) => classify_status(response.status()),
            // Transport-level failures (DNS, connect, reset) are always
            // worth retrying.
            Err(e) => DeleteOutcome::Retriable(e.to_string()),
        };

        if let DeleteOutcome::Retriable(reason) = &outcome {
            warn!(blob_object_id, error = %reason, "blob delete hit a transient failure");
        }

        Ok(outcome)
    }
}
