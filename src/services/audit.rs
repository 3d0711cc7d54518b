use crate::services::logger::Logger;
use crate::utils::paths::resolve_audit_path;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Append-only JSONL sink for invocation audit lines. Writes are
/// fire-and-forget: a failed append is logged and otherwise ignored so it
/// can never alter the result returned to the caller.
#[derive(Clone)]
pub struct AuditService {
    logger: Logger,
    file_path: PathBuf,
    queue: Arc<Mutex<()>>,
}

impl AuditService {
    pub fn new(logger: Logger) -> Self {
        Self::with_path(logger, resolve_audit_path())
    }

    pub fn with_path(logger: Logger, file_path: PathBuf) -> Self {
        Self {
            logger: logger.child("audit"),
            file_path,
            queue: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.file_path
    }

    pub fn append(&self, entry: &Value) {
        let payload = format!("{}\n", entry);
        let _guard = self.queue.lock();
        if let Some(parent) = self.file_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(err) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .and_then(|mut file| {
                use std::io::Write;
                file.write_all(payload.as_bytes())
            })
        {
            self.logger.warn(
                "Audit write failed",
                Some(&serde_json::json!({"error": err.to_string()})),
            );
        }
    }
}
