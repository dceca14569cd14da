//! Preconfigured HTTP client for the inference backend.

use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;

use crate::error::{ClientError, Result};
use crate::models::{PredictResult, PredictUpload};
use crate::util::{build_http_client, or_default, DEFAULT_BACKEND_URL};

/// Environment variable holding the client base URL.
pub const API_URL_ENV: &str = "VITE_API_URL";

/// Resolve the client base URL from an optional override.
pub fn resolve_base_url(value: Option<&str>) -> String {
    or_default(value, DEFAULT_BACKEND_URL)
}

/// Request client bound to a base URL. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, build_http_client())
    }

    /// Bind an existing `reqwest::Client` to `base_url`.
    pub fn with_http(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Client bound to `VITE_API_URL`, or the local backend when unset.
    pub fn from_env() -> Self {
        let value = std::env::var(API_URL_ENV).ok();
        Self::new(resolve_base_url(value.as_deref()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    /// `GET /health`, returning the backend's status document.
    pub async fn health(&self) -> Result<serde_json::Value> {
        let resp = self.get("/health").send().await?;
        read_json(resp).await
    }

    /// `POST /predict` with a multipart body, returning the raw JSON.
    pub async fn predict_raw(&self, upload: &PredictUpload) -> Result<serde_json::Value> {
        let form = predict_form(upload)?;
        tracing::debug!(
            url = %self.url("/predict"),
            filename = %upload.filename,
            mime = upload.mime,
            bytes = upload.bytes.len(),
            "submitting prediction"
        );
        let resp = self.post("/predict").multipart(form).send().await?;
        read_json(resp).await
    }

    /// `POST /predict`, decoded into [`PredictResult`].
    pub async fn predict(&self, upload: &PredictUpload) -> Result<PredictResult> {
        let value = self.predict_raw(upload).await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}

fn predict_form(upload: &PredictUpload) -> Result<Form> {
    let file = Part::bytes(upload.bytes.clone())
        .file_name(upload.filename.clone())
        .mime_str(upload.mime)
        .map_err(|_| ClientError::InvalidMime(upload.mime.to_string()))?;

    let mut form = Form::new().text("model_choice", upload.model_choice.clone());
    if let Some(c) = upload.conf_th {
        form = form.text("conf_th", c.to_string());
    }
    if let Some(i) = upload.iou_th {
        form = form.text("iou_th", i.to_string());
    }
    Ok(form.part("file", file))
}

/// Non-success statuses become [`ClientError::Status`] carrying the body text.
async fn read_json(resp: reqwest::Response) -> Result<serde_json::Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
