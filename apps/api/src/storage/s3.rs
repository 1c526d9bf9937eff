use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::storage::{dir_fragment, sanitize_file_name, FsItem, ObjectStorage, StoredFile, UploadFile};

/// S3 / MinIO backed object storage. Every key lives under `prefix`.
#[derive(Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, prefix: String) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }

    /// Constructs a client configured for MinIO (local) or AWS (production).
    pub async fn connect(config: &Config) -> Self {
        let credentials = Credentials::new(
            &config.aws_access_key_id,
            &config.aws_secret_access_key,
            None,
            None,
            "resumind-static",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&config.s3_endpoint)
            .load()
            .await;

        // MinIO only serves path-style URLs.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self::new(
            aws_sdk_s3::Client::from_conf(s3_config),
            config.s3_bucket.clone(),
            config.s3_prefix.clone(),
        )
    }

    fn object_key(&self, file_name: &str) -> String {
        format!(
            "{}{}-{}",
            self.prefix,
            Uuid::new_v4().simple(),
            sanitize_file_name(file_name)
        )
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(&self, file: UploadFile) -> Result<Option<StoredFile>> {
        let key = self.object_key(&file.name);
        let size = file.bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes))
            .content_type(&file.content_type)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Uploaded {} ({size} bytes) to s3://{}/{}", file.name, self.bucket, key);

        Ok(Some(StoredFile {
            path: key,
            name: file.name,
            size,
        }))
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 download of '{path}' failed: {e}"))?;

        let data = object
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read body of '{path}'"))?;

        Ok(data.into_bytes())
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 delete of '{path}' failed: {e}"))?;

        debug!("Deleted s3://{}/{}", self.bucket, path);
        Ok(true)
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<FsItem>> {
        let prefix = format!("{}{}", self.prefix, dir_fragment(path));
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("S3 list of '{prefix}' failed: {e}"))?;

            items.extend(page.contents().iter().filter_map(|object| object.key()).map(fs_item));

            match (page.is_truncated(), page.next_continuation_token()) {
                (Some(true), Some(token)) => continuation = Some(token.to_string()),
                _ => break,
            }
        }

        debug!("Listed {} objects under s3://{}/{}", items.len(), self.bucket, prefix);
        Ok(items)
    }
}

/// Listing entry for an object key. The key doubles as the id because ETags
/// repeat for identical content.
fn fs_item(key: &str) -> FsItem {
    FsItem {
        id: key.to_string(),
        name: key.rsplit('/').next().unwrap_or(key).to_string(),
        path: key.to_string(),
    }
}
