//! In-process stock log

use async_trait::async_trait;
use parking_lot::Mutex;
use shelfwatch_core::LogRecord;

use crate::error::StorageError;
use crate::StockLog;

/// Keeps every appended record in memory. Used for dry runs and tests.
#[derive(Default)]
pub struct MemoryLog {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl StockLog for MemoryLog {
    async fn append(&self, record: &LogRecord) -> Result<String, StorageError> {
        let mut records = self.records.lock();
        records.push(record.clone());
        Ok(format!("memory-{}", records.len()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfwatch_core::{ImageSource, StockReport, Threshold};

    #[tokio::test]
    async fn test_memory_log_appends_in_order() {
        let log = MemoryLog::new();
        assert!(log.is_empty());

        for count in [1, 7] {
            let report = StockReport::new(count, Threshold::default());
            let record = LogRecord::from_report(&report, ImageSource::Upload, None);
            log.append(&record).await.unwrap();
        }

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].count, 1);
        assert_eq!(records[1].count, 7);
    }
}
