//! End-to-end check of the backend's `/predict` endpoint.
//!
//! One upload, one awaited response, then a key-presence check on the JSON
//! body. Nothing is retried and nothing is kept between runs.

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

use crate::api_client::ApiClient;
use crate::error::{ClientError, Result};
use crate::models::{PredictUpload, DEFAULT_MODEL_CHOICE};
use crate::util::{build_http_client, or_default, DEFAULT_BACKEND_URL};

pub const API_URL_ENV: &str = "API_URL";
pub const IMAGE_PATH_ENV: &str = "IMAGE_PATH";

/// Sample scan shipped with the dataset, relative to the crate root.
pub const SAMPLE_IMAGE: &str =
    "Brain-Tumor-Segmentation-1/train/images/Tr-no_0530_jpg.rf.9e490ab3c4795a63d61e48186c7bd5db.jpg";

/// Keys every prediction response must carry.
pub const REQUIRED_KEYS: [&str; 8] = [
    "filename",
    "model_used",
    "conf_th",
    "iou_th",
    "min_mask_area",
    "has_tumor",
    "confidence",
    "overlay_image",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    pub api_url: String,
    pub image_path: PathBuf,
}

impl SmokeConfig {
    pub fn new(api_url: Option<&str>, image_path: Option<&str>) -> Self {
        let image_path = match image_path.filter(|p| !p.is_empty()) {
            Some(p) => PathBuf::from(p),
            None => default_image_path(),
        };
        Self {
            api_url: or_default(api_url, DEFAULT_BACKEND_URL),
            image_path,
        }
    }

    pub fn from_env() -> Self {
        let api_url = std::env::var(API_URL_ENV).ok();
        let image_path = std::env::var(IMAGE_PATH_ENV).ok();
        Self::new(api_url.as_deref(), image_path.as_deref())
    }
}

pub fn default_image_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(SAMPLE_IMAGE)
}

/// Required keys absent from `body`, sorted. A non-object body lacks all of them.
pub fn missing_keys(body: &Value) -> Vec<String> {
    let mut missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|k| body.get(**k).is_none())
        .map(|k| k.to_string())
        .collect();
    missing.sort();
    missing
}

/// The fields echoed on success.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokeReport {
    pub model_used: Value,
    pub has_tumor: Value,
    pub confidence: Value,
}

impl SmokeReport {
    fn from_body(body: &Value) -> Self {
        let field = |k: &str| body.get(k).cloned().unwrap_or(Value::Null);
        Self {
            model_used: field("model_used"),
            has_tumor: field("has_tumor"),
            confidence: field("confidence"),
        }
    }
}

impl fmt::Display for SmokeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OK {} {{ model_used: {}, has_tumor: {}, confidence: {} }}",
            DEFAULT_MODEL_CHOICE, self.model_used, self.has_tumor, self.confidence
        )
    }
}

/// Run the smoke test once.
pub async fn run(config: &SmokeConfig) -> Result<SmokeReport> {
    run_with_client(config, build_http_client()).await
}

/// Run the smoke test once, sending through `http`.
pub async fn run_with_client(config: &SmokeConfig, http: reqwest::Client) -> Result<SmokeReport> {
    let upload = PredictUpload::from_path(&config.image_path).await?;
    tracing::info!(
        api_url = %config.api_url,
        image = %config.image_path.display(),
        mime = upload.mime,
        "posting smoke-test image"
    );

    let client = ApiClient::with_http(config.api_url.clone(), http);
    let body = client.predict_raw(&upload).await?;

    let missing = missing_keys(&body);
    if !missing.is_empty() {
        return Err(ClientError::MissingKeys(missing));
    }

    Ok(SmokeReport::from_body(&body))
}
