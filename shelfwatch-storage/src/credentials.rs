//! Service-account credentials and OAuth2 access tokens

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use shelfwatch_core::CredentialSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StorageError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DATABASE_SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const TOKEN_LIFETIME_SECS: i64 = 3600;
// Refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn env_credential(var: &str) -> Result<String, StorageError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(StorageError::Credentials(format!(
            "environment variable {} is not set",
            var
        ))),
    }
}

/// Token source for a credential setting
pub fn token_source(source: &CredentialSource) -> Result<Arc<dyn TokenSource>, StorageError> {
    match source {
        CredentialSource::AccessToken { var } => {
            let token = env_credential(var)?;
            info!("Using pre-issued access token from {}", var);
            Ok(Arc::new(StaticToken(token.trim().to_string())))
        }
        other => {
            let account = ServiceAccount::load(other)?;
            Ok(Arc::new(ServiceAccountTokenSource::new(account)))
        }
    }
}

/// The subset of a Google service-account key file we need
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccount {
    pub fn load(source: &CredentialSource) -> Result<Self, StorageError> {
        let raw = match source {
            CredentialSource::File { path } => std::fs::read_to_string(path).map_err(|e| {
                StorageError::Credentials(format!("cannot read {}: {}", path.display(), e))
            })?,
            CredentialSource::Environment { var } => env_credential(var)?,
            CredentialSource::AccessToken { .. } => {
                return Err(StorageError::Credentials(
                    "an access token source holds no service account".to_string(),
                ))
            }
        };
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        let account: ServiceAccount = serde_json::from_str(raw)
            .map_err(|e| StorageError::Credentials(format!("invalid service account JSON: {}", e)))?;

        if account.client_email.trim().is_empty() {
            return Err(StorageError::Credentials("client_email is empty".to_string()));
        }
        if !account.private_key.contains("PRIVATE KEY") {
            return Err(StorageError::Credentials(
                "private_key is not a PEM encoded key".to_string(),
            ));
        }
        Ok(account)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

/// Anything able to hand out a bearer token for the database
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, StorageError>;
}

/// A pre-issued access token, sent unchanged on every request
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, StorageError> {
        Ok(self.0.clone())
    }
}

/// Exchanges a signed JWT assertion for an OAuth2 access token and caches it
pub struct ServiceAccountTokenSource {
    account: ServiceAccount,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(account: ServiceAccount) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            account,
            client,
            cached: Mutex::new(None),
        }
    }

    fn signed_assertion(&self, now: i64) -> Result<String, StorageError> {
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: DATABASE_SCOPES,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())
            .map_err(|e| StorageError::Credentials(format!("invalid private key: {}", e)))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| StorageError::Auth(format!("failed to sign assertion: {}", e)))
    }

    async fn fetch(&self, now: i64) -> Result<CachedToken, StorageError> {
        let assertion = self.signed_assertion(now)?;
        debug!("Requesting access token for {}", self.account.client_email);

        let response = self
            .client
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        info!("Obtained database access token for {}", self.account.client_email);

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, StorageError> {
        let now = Utc::now().timestamp();
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at - EXPIRY_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}
