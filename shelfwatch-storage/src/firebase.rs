//! Firebase Realtime Database REST client

use async_trait::async_trait;
use serde::Deserialize;
use shelfwatch_core::LogRecord;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::credentials::TokenSource;
use crate::error::StorageError;
use crate::StockLog;

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Appends records under `{database_url}/{namespace}` with a `POST`
pub struct FirebaseLog {
    client: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenSource>,
}

impl FirebaseLog {
    pub fn new(
        database_url: &str,
        namespace: &str,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, StorageError> {
        let base = database_url.trim().trim_end_matches('/');
        let namespace = namespace.trim().trim_matches('/');

        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(StorageError::Credentials(format!(
                "database URL must be http(s): {}",
                database_url
            )));
        }
        if namespace.is_empty() || namespace.contains("..") {
            return Err(StorageError::Credentials(format!(
                "invalid namespace: {:?}",
                namespace
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}.json", base, namespace),
            tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StockLog for FirebaseLog {
    async fn append(&self, record: &LogRecord) -> Result<String, StorageError> {
        let token = self.tokens.access_token().await?;
        debug!("Appending stock record to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("access_token", token.as_str())])
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let pushed: PushResponse = response.json().await?;
        info!(
            "Logged {} ({} products, threshold {}) as {}",
            record.tier, record.count, record.threshold, pushed.name
        );
        Ok(pushed.name)
    }

    fn name(&self) -> &str {
        "firebase"
    }
}
