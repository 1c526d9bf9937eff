//! Status text and the processing flag for the upload-analyze workflow.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

pub const STATUS_UPLOADING_FILE: &str = "Uploading the file...";
pub const STATUS_CONVERTING: &str = "Converting to image...";
pub const STATUS_UPLOADING_IMAGE: &str = "Uploading the Image...";
pub const STATUS_PREPARING: &str = "Preparing data...";
pub const STATUS_ANALYZING: &str = "Analyzing...";
pub const STATUS_COMPLETE: &str = "Analysis complete, redirecting...";

pub trait ProgressReporter: Send + Sync {
    fn report(&self, status: &str);
}

/// No-op reporter for unit tests.
#[cfg(test)]
pub struct NoopProgress;

#[cfg(test)]
impl ProgressReporter for NoopProgress {
    fn report(&self, _status: &str) {}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatus {
    pub is_processing: bool,
    pub status_text: Option<String>,
}

/// Per-user view of the upload-analyze workflow. Each user may hold the
/// processing flag for at most one run at a time.
#[derive(Clone, Default)]
pub struct UploadTracker {
    inner: Arc<Mutex<HashMap<String, UploadStatus>>>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, username: &str) -> UploadStatus {
        self.inner
            .lock()
            .ok()
            .and_then(|users| users.get(username).cloned())
            .unwrap_or_default()
    }

    /// Claims `username`'s processing flag. `None` when that user already has a run in flight.
    pub fn try_begin(&self, username: &str) -> Option<ProcessingGuard> {
        let mut users = self.inner.lock().ok()?;
        let state = users.entry(username.to_string()).or_default();
        if state.is_processing {
            return None;
        }
        state.is_processing = true;
        state.status_text = None;
        Some(ProcessingGuard {
            inner: Arc::clone(&self.inner),
            username: username.to_string(),
        })
    }
}

/// Holds one user's processing flag; dropping it clears the flag but keeps
/// the last status text visible.
pub struct ProcessingGuard {
    inner: Arc<Mutex<HashMap<String, UploadStatus>>>,
    username: String,
}

impl ProgressReporter for ProcessingGuard {
    fn report(&self, status: &str) {
        if let Ok(mut users) = self.inner.lock() {
            users.entry(self.username.clone()).or_default().status_text = Some(status.to_string());
        }
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if let Ok(mut users) = self.inner.lock() {
            if let Some(state) = users.get_mut(&self.username) {
                state.is_processing = false;
            }
        }
    }
}
