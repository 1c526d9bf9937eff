//! Object storage seam. Uploaded resumes and their preview images live here.
//!
//! The workflow only sees the `ObjectStorage` trait; `S3Storage` is the
//! production backend (S3 or MinIO).

pub mod s3;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

pub use s3::S3Storage;

/// An in-memory file handed to storage or the rasterizer.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub path: String,
    pub name: String,
    pub size: usize,
}

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FsItem {
    /// The object key; unique within the bucket.
    pub id: String,
    pub name: String,
    pub path: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `file`. `None` means the backend accepted the call but produced no path.
    async fn upload(&self, file: UploadFile) -> Result<Option<StoredFile>>;

    async fn read(&self, path: &str) -> Result<Bytes>;

    async fn delete(&self, path: &str) -> Result<bool>;

    /// Lists every file below `path`. `"./"` lists the whole application root.
    async fn read_dir(&self, path: &str) -> Result<Vec<FsItem>>;
}

/// Replaces anything outside `[A-Za-z0-9._-]` so user file names are safe as object keys.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Maps a directory argument (`"./"`, `"/"`, `"sub/dir"`) onto a key prefix fragment.
pub fn dir_fragment(path: &str) -> String {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let trimmed = trimmed.trim_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name_keeps_safe_characters() {
        assert_eq!(sanitize_file_name("resume_v2-final.pdf"), "resume_v2-final.pdf");
    }

    #[test]
    fn test_sanitize_file_name_replaces_spaces_and_strips_directories() {
        assert_eq!(sanitize_file_name("My Resume (1).pdf"), "My_Resume__1_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\cv.pdf"), "cv.pdf");
    }

    #[test]
    fn test_sanitize_file_name_never_empty_or_hidden() {
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("..."), "file");
        assert_eq!(sanitize_file_name(".env"), "env");
    }

    #[test]
    fn test_dir_fragment_root_forms() {
        assert_eq!(dir_fragment("./"), "");
        assert_eq!(dir_fragment("/"), "");
        assert_eq!(dir_fragment(""), "");
        assert_eq!(dir_fragment("."), "");
        assert_eq!(dir_fragment("./previews"), "previews/");
        assert_eq!(dir_fragment("/a/b/"), "a/b/");
    }
}
