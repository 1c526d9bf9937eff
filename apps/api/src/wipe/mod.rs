//! App data wipe: delete every stored file, then clear the KV namespace.
//!
//! Deletion is sequential and best-effort: a file that cannot be deleted is
//! logged and reported, and the wipe carries on.

pub mod handlers;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::kv::KvStore;
use crate::storage::{FsItem, ObjectStorage};

/// The application root, as understood by `ObjectStorage::read_dir`.
pub const APP_ROOT: &str = "./";

#[derive(Debug, Serialize)]
pub struct WipeReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    /// Listing taken after the wipe. Empty unless some delete failed.
    pub remaining: Vec<FsItem>,
}

pub async fn list_files(storage: &dyn ObjectStorage) -> Result<Vec<FsItem>, AppError> {
    storage
        .read_dir(APP_ROOT)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))
}

pub async fn wipe_app_data(storage: &dyn ObjectStorage, kv: &dyn KvStore) -> Result<WipeReport, AppError> {
    let files = list_files(storage).await?;
    info!("Wiping {} stored files", files.len());

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for file in files {
        match storage.delete(&file.path).await {
            Ok(true) => deleted.push(file.path),
            Ok(false) => {
                warn!("Delete of {} reported nothing removed", file.path);
                failed.push(file.path);
            }
            Err(e) => {
                warn!("Failed to delete {}: {e}", file.path);
                failed.push(file.path);
            }
        }
    }

    kv.flush().await.map_err(|e| AppError::Kv(e.to_string()))?;

    let remaining = list_files(storage).await?;
    info!(
        "Wipe finished: {} deleted, {} failed, {} remaining",
        deleted.len(),
        failed.len(),
        remaining.len()
    );

    Ok(WipeReport {
        deleted,
        failed,
        remaining,
    })
}
