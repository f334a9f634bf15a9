pub mod error;
pub mod types;
pub mod stock;
pub mod config;
pub mod banner;

pub use error::{Error, Result};
pub use types::{Detection, DetectionSet, BoundingBox, ImageSource, LogRecord};
pub use stock::{classify, StockReport, StockTier, Threshold};
pub use config::{ShelfConfig, CredentialSource, ConfigError};
