#![forbid(unsafe_code)]
#![doc = r#"
Tumorscope

Client-side glue for a tumor segmentation inference backend.

Crate highlights
- `api_client`: `ApiClient` bound to `VITE_API_URL` (default `http://127.0.0.1:8000`).
- `proxy` / `dev_server`: the `/api` proxy rule and the dev/preview server on port 5174
  that strips the prefix and forwards to `VITE_API_PROXY_TARGET`.
- `smoke`: posts one image to `/predict` and checks the response shape (`smoke` binary).

Modules
- `models`: `PredictResult` and `PredictUpload`.
- `error`: `ClientError`.
- `util`: Shared helpers (tracing, env, JSON errors, CORS).

Note: the backend owns the `/predict` contract; the key list checked here mirrors what the
frontend relies on, nothing more.
"#]

pub mod api_client;
pub mod dev_server;
pub mod error;
pub mod models;
pub mod proxy;
pub mod smoke;
pub mod util;

pub use crate::api_client::ApiClient;
pub use crate::error::ClientError;
pub use crate::models::{PredictResult, PredictUpload};
pub use crate::proxy::{DevServerConfig, ProxyRule, ServerMode};
