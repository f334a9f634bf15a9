// Configuration for the shelf monitor and both front ends

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::stock::{Threshold, SLIDER_MAX, SLIDER_MIN};

/// Google Drive export link for the shelf detection weights
pub const DEFAULT_MODEL_URL: &str =
    "https://drive.google.com/uc?export=download&id=1LAR_IQRVWVFamowFUOkmgo8ccTs3W3Rm";
pub const DEFAULT_DATABASE_URL: &str = "https://stockleveldetection-default-rtdb.firebaseio.com/";
pub const DEFAULT_NAMESPACE: &str = "stock_logs";
pub const DEFAULT_CREDENTIALS_VAR: &str = "FIREBASE_CREDENTIALS";

/// Detection model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Local artifact path
    pub path: PathBuf,
    /// Where to fetch the artifact when `path` is missing
    pub url: String,
    /// Optional SHA-256 of the artifact (hex). Empty skips the check.
    pub checksum: String,
    /// Square model input edge in pixels
    pub input_size: u32,
    /// Candidate score cut-off applied while decoding model output
    pub confidence: f32,
    /// IoU above which overlapping boxes of one class are suppressed
    pub iou: f32,
    pub max_detections: usize,
    /// Class labels by id. Unknown ids are labelled `class_<id>`.
    pub class_names: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("best.onnx"),
            url: DEFAULT_MODEL_URL.to_string(),
            checksum: String::new(),
            input_size: 640,
            confidence: 0.25,
            iou: 0.7,
            max_detections: 300,
            class_names: vec!["product".to_string()],
        }
    }
}

impl ModelConfig {
    pub fn label_for(&self, class_id: usize) -> String {
        self.class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    /// Starting threshold for a session
    pub threshold: Threshold,
}

/// Local webcam capture for the console
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index (0, 1, 2, ...)
    pub camera_id: u32,
    /// Where a captured frame is written. The file is left in place.
    pub capture_path: PathBuf,
    pub window_title: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera_id: 0,
            capture_path: PathBuf::from("captured_image.jpg"),
            window_title: "Press SPACE to capture | ESC to exit".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// When set, the annotated image of every inspection is written here
    pub annotated_output: Option<PathBuf>,
}

/// Web front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Directory for per-request upload files. Defaults to the system temp dir.
    pub temp_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8501,
            temp_dir: None,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Where the log store's credentials come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSource {
    /// Service-account JSON on disk, absolute or relative to the working dir
    File { path: PathBuf },
    /// Service-account JSON held in an environment variable
    Environment { var: String },
    /// A pre-issued OAuth2 access token held in an environment variable.
    /// Used as is; nothing refreshes it.
    AccessToken { var: String },
}

impl Default for CredentialSource {
    fn default() -> Self {
        CredentialSource::Environment {
            var: DEFAULT_CREDENTIALS_VAR.to_string(),
        }
    }
}

/// Remote stock log (Firebase Realtime Database)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogStoreConfig {
    pub enabled: bool,
    /// Keep records in process memory instead of posting them
    pub dry_run: bool,
    pub database_url: String,
    pub namespace: String,
    pub credentials: CredentialSource,
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dry_run: false,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            credentials: CredentialSource::default(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub model: ModelConfig,
    pub stock: StockConfig,
    pub camera: CameraConfig,
    pub console: ConsoleConfig,
    pub server: ServerConfig,
    pub log_store: LogStoreConfig,
    pub log_level: String,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            stock: StockConfig::default(),
            camera: CameraConfig::default(),
            console: ConsoleConfig::default(),
            server: ServerConfig::default(),
            log_store: LogStoreConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ShelfConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// Load configuration from string (JSON, TOML or YAML)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        if let Ok(config) = serde_json::from_str::<ShelfConfig>(content) {
            return Ok(config);
        }

        let toml_err = match toml::from_str::<ShelfConfig>(content) {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };

        if let Ok(config) = serde_yaml::from_str::<ShelfConfig>(content) {
            return Ok(config);
        }

        Err(ConfigError::ParseError(format!(
            "not valid JSON, TOML or YAML ({})",
            toml_err.message()
        )))
    }

    /// Defaults overlaid with environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Optional file, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `SHELFWATCH_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = get("SHELFWATCH_MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }

        if let Some(raw) = get("SHELFWATCH_THRESHOLD") {
            let value: u32 = raw.trim().parse().map_err(|_| {
                ConfigError::ParseError(format!("SHELFWATCH_THRESHOLD is not an integer: {}", raw))
            })?;
            self.stock.threshold = Threshold::new(value)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        if let Some(raw) = get("SHELFWATCH_PORT") {
            self.server.port = raw.trim().parse().map_err(|_| {
                ConfigError::ParseError(format!("SHELFWATCH_PORT is not a port number: {}", raw))
            })?;
        }

        if let Some(host) = get("SHELFWATCH_HOST") {
            self.server.bind_address = host;
        }

        if let Some(level) = get("SHELFWATCH_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(url) = get("SHELFWATCH_DATABASE_URL") {
            self.log_store.database_url = url;
            self.log_store.enabled = true;
        }

        if let Some(raw) = get("SHELFWATCH_LOG_DRY_RUN") {
            self.log_store.dry_run = raw.trim().parse().map_err(|_| {
                ConfigError::ParseError(format!("SHELFWATCH_LOG_DRY_RUN is not true/false: {}", raw))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.stock.threshold.get();
        if !(SLIDER_MIN..=SLIDER_MAX).contains(&threshold) {
            return Err(ConfigError::ValidationError(format!(
                "stock.threshold must be within {}..={} (got {})",
                SLIDER_MIN, SLIDER_MAX, threshold
            )));
        }

        if self.model.input_size == 0 || self.model.input_size % 32 != 0 {
            return Err(ConfigError::ValidationError(
                "model.input_size must be a positive multiple of 32".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.model.confidence) {
            return Err(ConfigError::ValidationError(
                "model.confidence must be within [0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.model.iou) {
            return Err(ConfigError::ValidationError(
                "model.iou must be within [0, 1]".to_string(),
            ));
        }

        if self.model.max_detections == 0 {
            return Err(ConfigError::ValidationError(
                "model.max_detections must be > 0".to_string(),
            ));
        }

        if !self.model.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(
                "model.url must use https".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port cannot be 0".to_string(),
            ));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_upload_bytes must be > 0".to_string(),
            ));
        }

        if self.log_store.enabled && !self.log_store.dry_run {
            if self.log_store.database_url.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "log_store.database_url is required when the log store is enabled".to_string(),
                ));
            }
            if self.log_store.namespace.trim().is_empty() || self.log_store.namespace.contains("..") {
                return Err(ConfigError::ValidationError(
                    "log_store.namespace is invalid".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(err: ConfigError) -> Self {
        crate::error::Error::Configuration(err.to_string())
    }
}
