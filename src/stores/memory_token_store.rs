use crate::errors::InvokeError;
use crate::managers::auth::TokenStore;
use crate::model::TokenRecord;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// In-memory token store. Insertion order is preserved so "the first
/// non-expired token" is deterministic.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<RwLock<Vec<TokenRecord>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, records: Vec<TokenRecord>) {
        let mut tokens = self.tokens.write().unwrap();
        for record in records {
            upsert(&mut tokens, record);
        }
    }

    pub fn snapshot(&self) -> Vec<TokenRecord> {
        self.tokens.read().unwrap().clone()
    }
}

fn upsert(tokens: &mut Vec<TokenRecord>, record: TokenRecord) {
    match tokens.iter_mut().find(|existing| existing.id == record.id) {
        Some(existing) => *existing = record,
        None => tokens.push(record),
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn list(
        &self,
        owner_id: &str,
        provider_id: &str,
    ) -> Result<Vec<TokenRecord>, InvokeError> {
        Ok(self
            .tokens
            .read()
            .unwrap()
            .iter()
            .filter(|token| token.owner_id == owner_id && token.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, record: TokenRecord) -> Result<(), InvokeError> {
        upsert(&mut self.tokens.write().unwrap(), record);
        Ok(())
    }

    async fn mark_used(&self, token_id: &str) -> Result<(), InvokeError> {
        let mut tokens = self.tokens.write().unwrap();
        if let Some(token) = tokens.iter_mut().find(|token| token.id == token_id) {
            token.last_used_at = Some(chrono::Utc::now());
        }
        Ok(())
    }
}
