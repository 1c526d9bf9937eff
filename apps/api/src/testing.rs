//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::inference::{Inference, InferenceResponse};
use crate::kv::KvStore;
use crate::rasterize::{DocumentRasterizer, Rasterized};
use crate::storage::{dir_fragment, FsItem, ObjectStorage, StoredFile, UploadFile};
use crate::submission::model::fixtures::FEEDBACK_JSON;
use crate::submission::progress::ProgressReporter;
use crate::submission::workflow::{AnalyzeRequest, Collaborators, IdGenerator};

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF";

pub fn analyze_request() -> AnalyzeRequest {
    AnalyzeRequest {
        company_name: "Acme".to_string(),
        job_title: "Engineer".to_string(),
        job_description: "Build reliable backend services.".to_string(),
        file: UploadFile::new("resume.pdf", "application/pdf", Bytes::from_static(PDF_BYTES)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Storage
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Bytes>>,
    uploads: Mutex<Vec<String>>,
    rejected_uploads: Mutex<HashSet<usize>>,
    upload_error: Mutex<Option<String>>,
    undeletable: Mutex<HashSet<String>>,
}

impl MemoryStorage {
    /// The `n`th upload call (1-based) returns no path.
    pub fn reject_upload(&self, n: usize) {
        self.rejected_uploads.lock().unwrap().insert(n);
    }

    pub fn fail_uploads_with(&self, message: &str) {
        *self.upload_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn refuse_delete(&self, path: &str) {
        self.undeletable.lock().unwrap().insert(path.to_string());
    }

    pub fn insert(&self, path: &str, bytes: &'static [u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), Bytes::from_static(bytes));
    }

    pub fn upload_names(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, file: UploadFile) -> Result<Option<StoredFile>> {
        let call = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(file.name.clone());
            uploads.len()
        };
        if let Some(message) = self.upload_error.lock().unwrap().clone() {
            anyhow::bail!(message);
        }
        if self.rejected_uploads.lock().unwrap().contains(&call) {
            return Ok(None);
        }
        let path = format!("uploads/{call}-{}", file.name);
        let size = file.bytes.len();
        self.files.lock().unwrap().insert(path.clone(), file.bytes);
        Ok(Some(StoredFile {
            path,
            name: file.name,
            size,
        }))
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such file: {path}"))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        if self.undeletable.lock().unwrap().contains(path) {
            anyhow::bail!("permission denied: {path}");
        }
        Ok(self.files.lock().unwrap().remove(path).is_some())
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<FsItem>> {
        let prefix = format!("uploads/{}", dir_fragment(path));
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .map(|k| FsItem {
                id: k.clone(),
                name: k.rsplit('/').next().unwrap_or(k).to_string(),
                path: k.clone(),
            })
            .collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Key-value store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<BTreeMap<String, String>>,
    set_results: Mutex<VecDeque<bool>>,
    writes: AtomicUsize,
}

impl MemoryKv {
    /// Scripted results for the next `set` calls; afterwards writes succeed.
    pub fn script_set_results(&self, results: &[bool]) {
        self.set_results.lock().unwrap().extend(results.iter().copied());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<bool> {
        let accepted = self.set_results.lock().unwrap().pop_front().unwrap_or(true);
        if !accepted {
            return Ok(false);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn flush(&self) -> Result<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Inference, rasterizer, ids, progress
// ────────────────────────────────────────────────────────────────────────────

pub enum InferenceScript {
    Respond(InferenceResponse),
    Nothing,
    Fail(String),
}

pub struct ScriptedInference {
    script: Mutex<InferenceScript>,
    calls: Mutex<Vec<(String, String)>>,
}

impl Default for ScriptedInference {
    fn default() -> Self {
        Self {
            script: Mutex::new(InferenceScript::Respond(InferenceResponse::from_blocks(vec![
                FEEDBACK_JSON.to_string(),
            ]))),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedInference {
    pub fn script(&self, script: InferenceScript) {
        *self.script.lock().unwrap() = script;
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Inference for ScriptedInference {
    async fn feedback(&self, document_path: &str, instructions: &str) -> Result<Option<InferenceResponse>> {
        self.calls
            .lock()
            .unwrap()
            .push((document_path.to_string(), instructions.to_string()));
        match &*self.script.lock().unwrap() {
            InferenceScript::Respond(response) => Ok(Some(response.clone())),
            InferenceScript::Nothing => Ok(None),
            InferenceScript::Fail(message) => Err(anyhow::anyhow!(message.clone())),
        }
    }
}

pub struct FakeRasterizer {
    result: Mutex<Rasterized>,
    calls: AtomicUsize,
}

impl Default for FakeRasterizer {
    fn default() -> Self {
        Self {
            result: Mutex::new(Rasterized::image(UploadFile::new(
                "resume.png",
                "image/png",
                Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
            ))),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeRasterizer {
    pub fn set(&self, result: Rasterized) {
        *self.result.lock().unwrap() = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRasterizer for FakeRasterizer {
    async fn convert(&self, _file: &UploadFile) -> Rasterized {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
}

pub struct FixedId(pub String);

impl IdGenerator for FixedId {
    fn generate(&self) -> String {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    statuses: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Harness
// ────────────────────────────────────────────────────────────────────────────

/// Concrete fakes plus the `Collaborators` bundle built from them.
pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub kv: Arc<MemoryKv>,
    pub inference: Arc<ScriptedInference>,
    pub rasterizer: Arc<FakeRasterizer>,
    pub id: String,
}

impl Harness {
    pub const ID: &'static str = "5b0e8c7e-1f1c-4d8a-9d51-8a7b0f0f4b11";

    pub fn new() -> Self {
        Self::with_id(Self::ID)
    }

    pub fn with_id(id: &str) -> Self {
        Self {
            storage: Arc::default(),
            kv: Arc::default(),
            inference: Arc::default(),
            rasterizer: Arc::default(),
            id: id.to_string(),
        }
    }

    /// Same storage and kv as `other`, fresh inference and rasterizer.
    pub fn sharing_backends(other: &Harness, id: &str) -> Self {
        Self {
            storage: Arc::clone(&other.storage),
            kv: Arc::clone(&other.kv),
            ..Self::with_id(id)
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            storage: self.storage.clone(),
            kv: self.kv.clone(),
            inference: self.inference.clone(),
            rasterizer: self.rasterizer.clone(),
            ids: Arc::new(FixedId(self.id.clone())),
        }
    }
}
