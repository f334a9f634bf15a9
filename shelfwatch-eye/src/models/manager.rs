//! Model manager with auto-download functionality

use crate::error::VisionError;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use shelfwatch_core::config::ModelConfig;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

const MAX_MODEL_SIZE: usize = 2_000_000_000; // 2GB max
const MIN_MODEL_SIZE: usize = 1024;
const DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

/// Makes sure the detection model artifact is on local disk
pub struct ModelManager {
    config: ModelConfig,
    allow_plain_http: bool,
}

impl ModelManager {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            allow_plain_http: false,
        }
    }

    /// Also fetch over plain http, for a local stand-in host
    #[cfg(test)]
    pub(crate) fn allowing_http(config: ModelConfig) -> Self {
        Self {
            config,
            allow_plain_http: true,
        }
    }

    pub fn model_path(&self) -> &PathBuf {
        &self.config.path
    }

    /// Return the local artifact, fetching it once when it is missing.
    ///
    /// There is no retry: a failed fetch is returned to the caller.
    pub async fn ensure_model_available(&self) -> Result<PathBuf, VisionError> {
        let model_path = self.config.path.clone();

        if model_path.exists() {
            info!("Model already present at {:?}", model_path);
            return Ok(model_path);
        }

        let url = self.config.url.as_str();
        if url.is_empty() || url.len() > 2048 {
            return Err(VisionError::Model("Invalid model URL".to_string()));
        }
        let plain_http_ok = self.allow_plain_http && url.starts_with("http://");
        if !url.starts_with("https://") && !plain_http_ok {
            return Err(VisionError::Model(
                "Only HTTPS URLs are allowed for model downloads".to_string(),
            ));
        }

        if let Some(parent) = model_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                info!("Created model directory: {:?}", parent);
            }
        }

        info!("Downloading model from {}", url);
        let bytes = self.download(url).await?;
        self.verify(&bytes)?;

        // Write next to the target first so a partial file never looks like a model
        let temp_path = model_path.with_extension("download");
        fs::write(&temp_path, &bytes)?;
        if let Err(e) = fs::rename(&temp_path, &model_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(VisionError::Io(e));
        }

        info!("Model saved to {:?} ({} bytes)", model_path, bytes.len());
        Ok(model_path)
    }

    async fn download(&self, url: &str) -> Result<bytes::Bytes, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .cookie_store(true)
            .build()?;

        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(VisionError::Model(format!(
                "Failed to download model: HTTP {}",
                response.status()
            )));
        }

        if !is_html(&response) {
            return Self::read_body(response).await;
        }

        // Large Drive files answer with a "can't scan for viruses" page first
        let page = response.text().await?;
        let confirm_url = drive_confirm_url(url, &page).ok_or_else(|| {
            VisionError::Model("Model URL returned an HTML page instead of the model".to_string())
        })?;
        warn!("Remote asked for download confirmation, following {}", confirm_url);

        let response = client.get(&confirm_url).send().await?;
        if !response.status().is_success() || is_html(&response) {
            return Err(VisionError::Model(format!(
                "Failed to download model after confirmation: HTTP {}",
                response.status()
            )));
        }
        Self::read_body(response).await
    }

    async fn read_body(response: reqwest::Response) -> Result<bytes::Bytes, VisionError> {
        if let Some(content_length) = response.content_length() {
            if content_length > MAX_MODEL_SIZE as u64 {
                return Err(VisionError::Model(format!(
                    "Model too large: {} bytes (max {} bytes)",
                    content_length, MAX_MODEL_SIZE
                )));
            }
        }
        Ok(response.bytes().await?)
    }

    fn verify(&self, bytes: &[u8]) -> Result<(), VisionError> {
        if bytes.len() > MAX_MODEL_SIZE {
            return Err(VisionError::Model(format!(
                "Downloaded model too large: {} bytes (max {} bytes)",
                bytes.len(),
                MAX_MODEL_SIZE
            )));
        }

        if bytes.len() < MIN_MODEL_SIZE {
            return Err(VisionError::Model(
                "Downloaded file too small, likely corrupted".to_string(),
            ));
        }

        let expected = self.config.checksum.trim();
        if expected.is_empty() {
            info!("Downloaded {} bytes (checksum verification skipped)", bytes.len());
            return Ok(());
        }

        let computed = hex::encode(Sha256::digest(bytes));
        if !computed.eq_ignore_ascii_case(expected) {
            return Err(VisionError::Model(format!(
                "Checksum mismatch: expected {}, got {}",
                expected, computed
            )));
        }
        info!("Verified model checksum");
        Ok(())
    }
}

fn is_html(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false)
}

/// Find the follow-up URL on a Google Drive download warning page.
///
/// Newer pages carry a form with hidden inputs; older ones a `confirm=` link.
pub(crate) fn drive_confirm_url(original_url: &str, page: &str) -> Option<String> {
    let form = Regex::new(r#"<form[^>]*action="([^"]+)""#).ok()?;
    let hidden = Regex::new(r#"<input[^>]*type="hidden"[^>]*name="([^"]+)"[^>]*value="([^"]*)""#).ok()?;

    if let Some(action) = form.captures(page).and_then(|c| c.get(1)) {
        let params: Vec<String> = hidden
            .captures_iter(page)
            .map(|c| format!("{}={}", &c[1], &c[2]))
            .collect();
        if !params.is_empty() {
            let action = action.as_str().replace("&amp;", "&");
            let sep = if action.contains('?') { '&' } else { '?' };
            return Some(format!("{}{}{}", action, sep, params.join("&")));
        }
    }

    let token = Regex::new(r"confirm=([0-9A-Za-z_\-]+)").ok()?;
    token
        .captures(page)
        .map(|c| format!("{}&confirm={}", original_url, &c[1]))
}
