use crate::errors::InvokeError;
use crate::model::{AuthRequirement, TokenRecord};
use crate::services::logger::Logger;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Per-provider credentials configured by the persistence layer. The OAuth
/// authorization-code redirect flow lives outside this engine; it populates
/// the token store the resolver reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProviderConfig {
    #[serde(rename_all = "camelCase")]
    Oauth {
        client_id: Option<String>,
        client_secret: Option<String>,
        token_url: String,
        authorize_url: String,
        #[serde(default)]
        scope: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ApiKey {
        key: String,
        #[serde(default)]
        header_name: Option<String>,
    },
}

/// Every way an auth requirement can resolve, made exhaustive so callers
/// cannot forget a branch.
#[derive(Debug, Clone)]
pub enum AuthResolution {
    Anonymous,
    ApiKey {
        key: String,
        header_name: Option<String>,
    },
    Valid(TokenRecord),
    Refreshed(TokenRecord),
    /// Not an error: a prompt the agent should surface so the end user can
    /// re-authenticate.
    ChallengeRequired { authorize_url: String },
    /// Terminal. Never offered a re-auth URL.
    Misconfigured { message: String },
}

impl AuthResolution {
    /// Claims exposed to templates as the `auth` context.
    pub fn claims(&self) -> Value {
        match self {
            AuthResolution::Anonymous => Value::Object(Default::default()),
            AuthResolution::ApiKey { key, .. } => serde_json::json!({
                "type": "apiKey",
                "apiKey": key,
            }),
            AuthResolution::Valid(token) | AuthResolution::Refreshed(token) => serde_json::json!({
                "type": "oauth",
                "accessToken": token.access_token,
                "scope": token.scope,
            }),
            AuthResolution::ChallengeRequired { .. } | AuthResolution::Misconfigured { .. } => {
                Value::Object(Default::default())
            }
        }
    }

    pub fn token(&self) -> Option<&TokenRecord> {
        match self {
            AuthResolution::Valid(token) | AuthResolution::Refreshed(token) => Some(token),
            _ => None,
        }
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn list(&self, owner_id: &str, provider_id: &str)
        -> Result<Vec<TokenRecord>, InvokeError>;
    async fn insert(&self, record: TokenRecord) -> Result<(), InvokeError>;
    async fn mark_used(&self, token_id: &str) -> Result<(), InvokeError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Seam for the refresh-grant network call so the token lifecycle is
/// testable without a provider.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<RefreshedToken, InvokeError>;
}

pub struct HttpTokenRefresher {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl HttpTokenRefresher {
    pub fn new(client: reqwest::Client, timeout_ms: u64) -> Self {
        Self { client, timeout_ms }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<RefreshedToken, InvokeError> {
        let payload = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        let response = self
            .client
            .post(token_url)
            .form(&payload)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|err| InvokeError::transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(InvokeError::http(format!(
                "Token refresh failed ({})",
                status.as_u16()
            )));
        }
        response
            .json::<RefreshedToken>()
            .await
            .map_err(|_| InvokeError::internal("Token refresh response invalid"))
    }
}

pub struct AuthResolver {
    logger: Logger,
    providers: HashMap<String, ProviderConfig>,
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
}

impl AuthResolver {
    pub fn new(
        logger: Logger,
        providers: HashMap<String, ProviderConfig>,
        store: Arc<dyn TokenStore>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            logger: logger.child("auth"),
            providers,
            store,
            refresher,
        }
    }

    pub async fn resolve(&self, requirement: &AuthRequirement, owner_id: &str) -> AuthResolution {
        match requirement {
            AuthRequirement::None => AuthResolution::Anonymous,
            AuthRequirement::ApiKey { provider_id } => match self.providers.get(provider_id) {
                Some(ProviderConfig::ApiKey { key, header_name }) => AuthResolution::ApiKey {
                    key: key.clone(),
                    header_name: header_name.clone(),
                },
                _ => AuthResolution::Misconfigured {
                    message: format!("API key provider '{}' is not configured", provider_id),
                },
            },
            AuthRequirement::Oauth { provider_id } => {
                self.resolve_oauth(provider_id, owner_id).await
            }
        }
    }

    async fn resolve_oauth(&self, provider_id: &str, owner_id: &str) -> AuthResolution {
        let Some(ProviderConfig::Oauth {
            client_id,
            client_secret,
            token_url,
            authorize_url,
            scope,
        }) = self.providers.get(provider_id)
        else {
            return AuthResolution::Misconfigured {
                message: format!("OAuth provider '{}' is not configured", provider_id),
            };
        };
        let (Some(client_id), Some(client_secret)) = (
            client_id.as_deref().filter(|s| !s.trim().is_empty()),
            client_secret.as_deref().filter(|s| !s.trim().is_empty()),
        ) else {
            return AuthResolution::Misconfigured {
                message: format!(
                    "OAuth provider '{}' is missing its client id or secret",
                    provider_id
                ),
            };
        };

        let tokens = match self.store.list(owner_id, provider_id).await {
            Ok(tokens) => tokens,
            Err(err) => {
                self.logger.warn(
                    "Token store read failed",
                    Some(&serde_json::json!({"provider": provider_id, "error": err.message})),
                );
                Vec::new()
            }
        };

        let now = Utc::now();
        if let Some(live) = tokens.iter().find(|token| !token.is_expired(now)) {
            self.touch(live.id.clone());
            return AuthResolution::Valid(live.clone());
        }

        for stale in tokens.iter() {
            let Some(refresh_token) = stale.refresh_token.as_deref() else {
                continue;
            };
            match self
                .refresher
                .refresh(token_url, client_id, client_secret, refresh_token)
                .await
            {
                Ok(fresh) => {
                    let record = TokenRecord {
                        id: uuid::Uuid::new_v4().to_string(),
                        owner_id: owner_id.to_string(),
                        provider_id: provider_id.to_string(),
                        access_token: fresh.access_token,
                        refresh_token: fresh
                            .refresh_token
                            .or_else(|| stale.refresh_token.clone()),
                        expires_at: fresh.expires_in.map(|secs| now + Duration::seconds(secs)),
                        scope: fresh.scope.or_else(|| stale.scope.clone()),
                        last_used_at: None,
                    };
                    // The record must be persisted before the credential is
                    // handed out; a token the store rejected is never
                    // returned. Concurrent refreshes for the same
                    // (owner, provider) are not serialized; inserts are
                    // last-writer-safe.
                    if let Err(err) = self.store.insert(record.clone()).await {
                        self.logger.error(
                            "Failed to persist refreshed token",
                            Some(&serde_json::json!({"provider": provider_id, "error": err.message})),
                        );
                        continue;
                    }
                    return AuthResolution::Refreshed(record);
                }
                Err(err) => {
                    self.logger.warn(
                        "Token refresh failed",
                        Some(&serde_json::json!({"provider": provider_id, "error": err.message})),
                    );
                }
            }
        }

        AuthResolution::ChallengeRequired {
            authorize_url: build_authorize_url(authorize_url, client_id, scope.as_deref()),
        }
    }

    /// Mark-used is fire-and-forget: its failure never blocks or fails the
    /// invocation.
    fn touch(&self, token_id: String) {
        let store = self.store.clone();
        let logger = self.logger.clone();
        tokio::spawn(async move {
            if let Err(err) = store.mark_used(&token_id).await {
                logger.debug(
                    "Failed to mark token used",
                    Some(&serde_json::json!({"token": token_id, "error": err.message})),
                );
            }
        });
    }
}

fn build_authorize_url(authorize_url: &str, client_id: &str, scope: Option<&str>) -> String {
    let Ok(mut url) = Url::parse(authorize_url) else {
        return authorize_url.to_string();
    };
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code");
    if let Some(scope) = scope {
        url.query_pairs_mut().append_pair("scope", scope);
    }
    url.to_string()
}
