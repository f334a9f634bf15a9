// HTTP server: monitoring page, JSON detection API and health check

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use shelfwatch_core::{Detection, ImageSource, ShelfConfig, StockTier, Threshold};
use shelfwatch_eye::{Inspection, InspectionResult, ShelfMonitor, VisionError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::page::{self, InputMethod, Outcome, PageView};

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<ShelfMonitor>,
    pub default_threshold: Threshold,
    pub temp_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(monitor: Arc<ShelfMonitor>, config: &ShelfConfig) -> Self {
        Self {
            monitor,
            default_threshold: Threshold::from_slider(i64::from(config.stock.threshold.get())),
            temp_dir: config.server.temp_dir(),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

// Response types
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub count: usize,
    pub threshold: u32,
    pub tier: StockTier,
    pub message: String,
    pub detections: Vec<Detection>,
    pub log_key: Option<String>,
}

impl From<InspectionResult> for DetectResponse {
    fn from(result: InspectionResult) -> Self {
        Self {
            count: result.report.count,
            threshold: result.report.threshold.get(),
            tier: result.report.tier,
            message: result.report.message(),
            detections: result.detections.detections,
            log_key: result.log_key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// A request that could not be served, with the status it maps to
#[derive(Debug)]
pub struct RequestError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl RequestError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code.to_string(),
        });
        (self.status, body).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for RequestError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(status, "PAYLOAD_TOO_LARGE", "Upload exceeds the size limit");
        }
        Self::new(status, "INVALID_FORM", err.body_text())
    }
}

/// Map pipeline failures to user-facing errors. Details stay in the log.
impl From<VisionError> for RequestError {
    fn from(err: VisionError) -> Self {
        error!("Detection failed: {}", err);
        match err {
            VisionError::Image(_) => {
                Self::bad_request("INVALID_IMAGE", "The uploaded file is not a readable image")
            }
            VisionError::Storage(_) => {
                Self::internal("LOG_WRITE_ERROR", "Detection ran but the stock log could not be written")
            }
            _ => Self::internal("DETECTION_ERROR", "Detection failed"),
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        error!("Upload storage failed: {}", err);
        Self::internal("UPLOAD_ERROR", "Could not store the uploaded image")
    }
}

/// Create HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(index_handler))
        .route("/detect", post(detect_page_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/detect", post(detect_api_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    pub method: Option<String>,
    pub threshold: Option<String>,
}

async fn index_handler(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Html<String> {
    let view = PageView {
        method: params.method.as_deref().map(InputMethod::parse).unwrap_or_default(),
        threshold: parse_threshold(params.threshold.as_deref(), state.default_threshold).get(),
        outcome: None,
    };
    Html(page::render(&view))
}

/// Form submission from the page; always answers with the page
async fn detect_page_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match DetectForm::read(multipart, state.default_threshold).await {
        Ok(form) => form,
        Err(e) => {
            let view = PageView {
                method: InputMethod::default(),
                threshold: state.default_threshold.get(),
                outcome: Some(Outcome::Failed(e.message)),
            };
            return (e.status, Html(page::render(&view))).into_response();
        }
    };

    let (method, threshold) = (form.method, form.threshold);
    let outcome = match run_detection(&state, form).await {
        Ok(result) => match result.annotated_png() {
            Ok(png) => Ok(Outcome::Detected { report: result.report, png }),
            Err(e) => Err(RequestError::from(e)),
        },
        Err(e) => Err(e),
    };

    let (status, outcome) = match outcome {
        Ok(outcome) => (StatusCode::OK, outcome),
        Err(e) => (e.status, Outcome::Failed(e.message)),
    };
    let view = PageView {
        method,
        threshold: threshold.get(),
        outcome: Some(outcome),
    };
    (status, Html(page::render(&view))).into_response()
}

async fn detect_api_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, RequestError> {
    let form = DetectForm::read(multipart, state.default_threshold).await?;
    let result = run_detection(&state, form).await?;
    Ok(Json(DetectResponse::from(result)))
}

/// Threshold from a form value: clamped to the slider range, default when unparsable
pub fn parse_threshold(raw: Option<&str>, default: Threshold) -> Threshold {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => match value.parse::<i64>() {
            Ok(n) => Threshold::from_slider(n),
            Err(_) => {
                warn!("Ignoring non-numeric threshold {:?}", value);
                default
            }
        },
        None => default,
    }
}

struct UploadedImage {
    file_name: String,
    extension: String,
    bytes: Vec<u8>,
}

struct DetectForm {
    image: UploadedImage,
    threshold: Threshold,
    method: InputMethod,
}

impl DetectForm {
    async fn read(mut multipart: Multipart, default_threshold: Threshold) -> Result<Self, RequestError> {
        let mut image = None;
        let mut threshold = None;
        let mut method = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    if !file_name.is_empty() || !bytes.is_empty() {
                        image = Some((file_name, bytes.to_vec()));
                    }
                }
                "threshold" => threshold = Some(field.text().await?),
                "method" => method = Some(field.text().await?),
                _ => {}
            }
        }

        let (file_name, bytes) = image
            .ok_or_else(|| RequestError::bad_request("MISSING_IMAGE", "No image was uploaded"))?;
        let extension = allowed_extension(&file_name).ok_or_else(|| {
            RequestError::bad_request(
                "UNSUPPORTED_FILE_TYPE",
                "Only .jpg, .jpeg and .png images are accepted",
            )
        })?;
        if bytes.is_empty() {
            return Err(RequestError::bad_request("EMPTY_IMAGE", "The uploaded image is empty"));
        }

        Ok(Self {
            image: UploadedImage { file_name, extension, bytes },
            threshold: parse_threshold(threshold.as_deref(), default_threshold),
            method: method.as_deref().map(InputMethod::parse).unwrap_or_default(),
        })
    }
}

fn allowed_extension(file_name: &str) -> Option<String> {
    let extension = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Write the upload to a temp file, inspect it, remove it.
///
/// The temp file is dropped (and deleted) before this returns, on every path.
async fn run_detection(state: &AppState, form: DetectForm) -> Result<InspectionResult, RequestError> {
    let DetectForm { image, threshold, method } = form;
    info!(
        "Inspecting {} ({} bytes) via {}",
        image.file_name,
        image.bytes.len(),
        method.as_str()
    );

    let dir = state.temp_dir.clone();
    let UploadedImage { extension, bytes, .. } = image;
    // File writes run off the runtime workers
    let upload = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        std::fs::create_dir_all(&dir)?;
        let mut upload = tempfile::Builder::new()
            .prefix("shelfwatch-upload-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(&dir)?;
        upload.write_all(&bytes)?;
        upload.flush()?;
        Ok(upload)
    })
    .await
    .map_err(|e| {
        error!("Upload storage task failed: {}", e);
        RequestError::internal("UPLOAD_ERROR", "Could not store the uploaded image")
    })??;

    let source = match method {
        InputMethod::Upload => ImageSource::Upload,
        InputMethod::Camera => ImageSource::Camera,
    };
    let inspection = state
        .monitor
        .inspect_path(upload.path(), threshold, source)
        .await;

    match tokio::task::spawn_blocking(move || upload.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to remove temp upload: {}", e),
        Err(e) => warn!("Temp upload removal task failed: {}", e),
    }

    match inspection? {
        Inspection::Detected(result) => Ok(result),
        Inspection::NotFound(path) => Err(RequestError::internal(
            "UPLOAD_ERROR",
            format!("Uploaded image vanished before inspection: {}", path.display()),
        )),
    }
}
