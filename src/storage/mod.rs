pub mod blob;
pub mod keys;
pub mod locks;
#[cfg(test)]
pub mod memory;
pub mod patients;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use blob::BlobStore;

/// Run store work on the blocking pool so filesystem calls never stall the
/// async workers.
pub async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("blocking storage task")))?
}

/// Read and decode a JSON blob. `Ok(None)` when the key is absent.
pub fn get_json<T: DeserializeOwned>(store: &dyn BlobStore, key: &str) -> AppResult<Option<T>> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode as indented JSON and replace whatever is stored under `key`.
pub fn put_json<T: Serialize>(store: &dyn BlobStore, key: &str, value: &T) -> AppResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    store.put(key, &bytes)?;
    tracing::debug!(key = %key, bytes = bytes.len(), "Blob written");
    Ok(())
}
