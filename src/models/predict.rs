use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model identifier the backend accepts for inference.
pub const DEFAULT_MODEL_CHOICE: &str = "custom";

/// Prediction result returned by `POST /predict`.
///
/// Mirrors the backend's result schema. The backend owns this contract;
/// fields it may omit are optional or defaulted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResult {
    pub filename: String,
    pub model_used: String,
    pub conf_th: f64,
    pub iou_th: f64,
    pub min_mask_area: u64,
    pub has_tumor: bool,
    pub confidence: f64,
    #[serde(default)]
    pub description: String,
    /// Base64 PNG of the segmentation overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<serde_json::Map<String, serde_json::Value>>,
}

/// An image to submit for prediction, plus optional threshold overrides.
#[derive(Debug, Clone)]
pub struct PredictUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub model_choice: String,
    pub conf_th: Option<f64>,
    pub iou_th: Option<f64>,
}

impl PredictUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime = mime_for_path(Path::new(&filename));
        Self {
            filename,
            bytes,
            mime,
            model_choice: DEFAULT_MODEL_CHOICE.to_string(),
            conf_th: None,
            iou_th: None,
        }
    }

    /// Read `path` from disk. The file name is the path's last component.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(filename, bytes))
    }

    pub fn with_thresholds(mut self, conf_th: Option<f64>, iou_th: Option<f64>) -> Self {
        self.conf_th = conf_th;
        self.iou_th = iou_th;
        self
    }
}

/// MIME type by file extension, case-insensitive.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
