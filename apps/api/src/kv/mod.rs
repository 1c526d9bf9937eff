//! Key-value store seam. Submission records are persisted here as JSON strings.

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, info};

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Returns `false` when the store refused the write.
    async fn set(&self, key: &str, value: &str) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<bool>;

    /// All `(key, value)` pairs whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>>;

    /// Removes every entry owned by this application.
    async fn flush(&self) -> Result<()>;
}

/// Redis backed store. Keys are written as `<namespace>:<key>` so that
/// `flush` never touches data belonging to other tenants of the same server.
#[derive(Clone)]
pub struct RedisKv {
    client: redis::Client,
    namespace: String,
}

const DELETE_BATCH: usize = 500;

impl RedisKv {
    pub fn new(client: redis::Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn scan_keys(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        prefix: &str,
    ) -> Result<Vec<String>> {
        let pattern = format!("{}*", escape_glob(&self.namespaced(prefix)));
        let mut keys = Vec::new();
        let mut iter: redis::AsyncIter<String> = conn.scan_match(pattern).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(self.namespaced(key), value).await?;
        debug!("kv set {key} ({} bytes)", value.len());
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(self.namespaced(key)).await?;
        Ok(removed > 0)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let mut conn = self.connection().await?;
        let keys = self.scan_keys(&mut conn, prefix).await?;
        let strip = format!("{}:", self.namespace);

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            // A key may expire or be deleted between SCAN and GET.
            let value: Option<String> = conn.get(&key).await?;
            if let Some(value) = value {
                let short = key.strip_prefix(&strip).unwrap_or(&key).to_string();
                entries.push((short, value));
            }
        }
        Ok(entries)
    }

    async fn flush(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let keys = self.scan_keys(&mut conn, "").await?;
        for chunk in keys.chunks(DELETE_BATCH) {
            conn.del::<_, ()>(chunk).await?;
        }
        info!("Flushed {} keys from kv namespace '{}'", keys.len(), self.namespace);
        Ok(())
    }
}

/// Escapes Redis glob metacharacters so a prefix only matches literally.
fn escape_glob(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
