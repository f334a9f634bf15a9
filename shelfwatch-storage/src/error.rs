//! Error types for shelfwatch-storage

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Write rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display() {
        let err = StorageError::Rejected { status: 401, body: "Permission denied".to_string() };
        assert_eq!(err.to_string(), "Write rejected with HTTP 401: Permission denied");
    }
}
