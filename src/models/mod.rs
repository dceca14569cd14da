//! Wire types shared by the API client and the smoke test.

pub mod predict;

pub use predict::{mime_for_path, PredictResult, PredictUpload, DEFAULT_MODEL_CHOICE};
