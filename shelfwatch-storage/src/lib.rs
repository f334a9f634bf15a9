//! shelfwatch-storage: remote stock log
//!
//! Every stock decision can be appended to a Firebase Realtime Database
//! namespace. Records are write-only; nothing here reads them back.

pub mod error;
pub mod credentials;
pub mod firebase;
pub mod memory;

use async_trait::async_trait;
use shelfwatch_core::config::LogStoreConfig;
use shelfwatch_core::LogRecord;
use std::sync::Arc;
use tracing::info;

pub use credentials::{token_source, ServiceAccount, ServiceAccountTokenSource, StaticToken, TokenSource};
pub use error::StorageError;
pub use firebase::FirebaseLog;
pub use memory::MemoryLog;

/// Append-only sink for stock decisions
#[async_trait]
pub trait StockLog: Send + Sync {
    /// Append one record, returning the key the store assigned to it
    async fn append(&self, record: &LogRecord) -> Result<String, StorageError>;

    fn name(&self) -> &str;
}

/// Build the configured log store, or `None` when logging is disabled
pub fn open_stock_log(config: &LogStoreConfig) -> Result<Option<Arc<dyn StockLog>>, StorageError> {
    if !config.enabled {
        info!("Stock log disabled");
        return Ok(None);
    }

    if config.dry_run {
        info!("Stock log dry run: records stay in memory");
        let log: Arc<dyn StockLog> = Arc::new(MemoryLog::new());
        return Ok(Some(log));
    }

    let tokens = token_source(&config.credentials)?;
    let log = FirebaseLog::new(&config.database_url, &config.namespace, tokens)?;
    info!("Stock log enabled: {}", log.endpoint());
    Ok(Some(Arc::new(log)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_disabled() {
        let config = LogStoreConfig::default();
        assert!(open_stock_log(&config).unwrap().is_none());
    }

    #[test]
    fn test_open_enabled_missing_credentials() {
        let mut config = LogStoreConfig::default();
        config.enabled = true;
        config.credentials = shelfwatch_core::CredentialSource::File {
            path: "/nonexistent/firebase.json".into(),
        };
        assert!(matches!(
            open_stock_log(&config),
            Err(StorageError::Credentials(_))
        ));
    }

    #[tokio::test]
    async fn test_open_dry_run_keeps_records_in_memory() {
        let mut config = LogStoreConfig::default();
        config.enabled = true;
        config.dry_run = true;
        config.database_url = String::new();
        config.credentials = shelfwatch_core::CredentialSource::File {
            path: "/nonexistent/firebase.json".into(),
        };

        let log = open_stock_log(&config).unwrap().unwrap();
        assert_eq!(log.name(), "memory");

        let report = shelfwatch_core::StockReport::new(3, shelfwatch_core::Threshold::default());
        let record = LogRecord::from_report(&report, shelfwatch_core::ImageSource::Upload, None);
        assert_eq!(log.append(&record).await.unwrap(), "memory-1");
    }

    #[test]
    fn test_open_with_access_token() {
        let var = "SHELFWATCH_TEST_OPEN_ACCESS_TOKEN";
        std::env::set_var(var, "ya29.token");
        let mut config = LogStoreConfig::default();
        config.enabled = true;
        config.credentials = shelfwatch_core::CredentialSource::AccessToken { var: var.to_string() };

        let log = open_stock_log(&config).unwrap().unwrap();
        assert_eq!(log.name(), "firebase");
    }
}
