use crate::errors::InvokeError;
use crate::managers::auth::TokenStore;
use crate::model::TokenRecord;
use crate::stores::memory_token_store::MemoryTokenStore;
use crate::utils::fs_atomic::atomic_write_text_file;
use crate::utils::paths::resolve_tokens_path;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// JSON-file token store: a memory store mirrored to disk with
/// write-temp-then-rename, so a refresh is persisted before its token is
/// handed out.
#[derive(Clone)]
pub struct FileTokenStore {
    inner: MemoryTokenStore,
    file_path: PathBuf,
    queue: Arc<Mutex<()>>,
}

impl FileTokenStore {
    pub fn new(inner: MemoryTokenStore) -> Self {
        Self::with_path(inner, resolve_tokens_path())
    }

    pub fn with_path(inner: MemoryTokenStore, file_path: PathBuf) -> Self {
        Self {
            inner,
            file_path,
            queue: Arc::new(Mutex::new(())),
        }
    }

    pub fn load_from_disk(&self) -> Result<(), InvokeError> {
        if !self.file_path.exists() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(&self.file_path)
            .map_err(|err| InvokeError::internal(format!("Failed to load token store: {}", err)))?;
        let parsed: Value = serde_json::from_str(&raw)
            .map_err(|err| InvokeError::internal(format!("Failed to parse token store: {}", err)))?;
        let entries = parsed
            .get("tokens")
            .cloned()
            .unwrap_or_else(|| parsed.clone());
        let records: Vec<TokenRecord> = serde_json::from_value(entries)
            .map_err(|err| InvokeError::internal(format!("Failed to parse token store: {}", err)))?;
        self.inner.load(records);
        Ok(())
    }

    pub fn persist(&self) -> Result<(), InvokeError> {
        let payload = serde_json::json!({
            "version": 1,
            "updatedAt": chrono::Utc::now().to_rfc3339(),
            "tokens": self.inner.snapshot(),
        });
        let text = serde_json::to_string_pretty(&payload).map_err(|err| {
            InvokeError::internal(format!("Failed to serialize token store: {}", err))
        })?;
        let _guard = self.queue.lock();
        atomic_write_text_file(&self.file_path, &format!("{}\n", text), 0o600).map_err(|err| {
            InvokeError::internal(format!("Failed to persist token store: {}", err))
        })?;
        Ok(())
    }

    pub fn inner(&self) -> &MemoryTokenStore {
        &self.inner
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn list(
        &self,
        owner_id: &str,
        provider_id: &str,
    ) -> Result<Vec<TokenRecord>, InvokeError> {
        self.inner.list(owner_id, provider_id).await
    }

    async fn insert(&self, record: TokenRecord) -> Result<(), InvokeError> {
        self.inner.insert(record).await?;
        self.persist()
    }

    async fn mark_used(&self, token_id: &str) -> Result<(), InvokeError> {
        self.inner.mark_used(token_id).await?;
        self.persist()
    }
}
