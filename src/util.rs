use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tracing_subscriber::{fmt, EnvFilter};

/// Default backend origin used by every component when no override is set.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Load environment files, then install the global tracing subscriber.
///
/// Env file lookup order:
/// - an explicit path in `ENV_FILE`, `ENVFILE` or `DOTENV_PATH`
/// - `.envfile` in the working directory
/// - standard `.env` discovery
///
/// Variables already present in the process environment are never
/// overwritten. The filter comes from `RUST_LOG`, defaulting to
/// `info,tower_http=info`.
pub fn init_tracing() {
    let env_source = load_env_file().unwrap_or_else(|| "none".into());

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".into());
    let subscriber = fmt().with_env_filter(EnvFilter::new(filter)).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    tracing::debug!("Environment loaded from: {}", env_source);
}

fn load_env_file() -> Option<String> {
    for key in ["ENV_FILE", "ENVFILE", "DOTENV_PATH"] {
        let Some(p) = env_non_empty(key) else {
            continue;
        };
        if std::path::Path::new(&p).is_file() && dotenvy::from_filename(&p).is_ok() {
            return Some(format!("{p} ({key})"));
        }
    }

    if std::path::Path::new(".envfile").is_file() && dotenvy::from_filename(".envfile").is_ok() {
        return Some(".envfile".into());
    }

    dotenvy::dotenv()
        .ok()
        .map(|path| path.display().to_string())
}

/// Read an environment variable, treating unset and empty alike.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Truthy env flag: 1, true, yes, on (case-insensitive).
pub fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Pick `value` when it is set and non-empty, else `default`. Never trims.
pub fn or_default(value: Option<&str>, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn http_client_builder() -> reqwest::ClientBuilder {
    let builder = reqwest::Client::builder()
        .user_agent(format!("tumorscope/{}", env!("CARGO_PKG_VERSION")));

    if env_flag("TUMORSCOPE_NO_PROXY") {
        builder.no_proxy()
    } else {
        builder
    }
}

/// Build the shared outbound HTTP client.
///
/// No timeout and no retry policy is configured; redirects are followed.
/// Setting `TUMORSCOPE_NO_PROXY` disables the system HTTP(S) proxy lookup.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized, like `reqwest::Client::new`.
pub fn build_http_client() -> reqwest::Client {
    http_client_builder()
        .build()
        .expect("failed to initialize reqwest client")
}

/// Client for the dev-server proxy. Redirects are handed back to the
/// caller untouched instead of being followed upstream.
///
/// # Panics
///
/// Same as [`build_http_client`].
pub fn build_proxy_http_client() -> reqwest::Client {
    http_client_builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("failed to initialize reqwest client")
}

/// Build a JSON error response with the given HTTP status and message.
pub fn error_response(status: StatusCode, msg: &str) -> Response {
    let body = serde_json::json!({ "error": { "message": msg } });
    (status, axum::Json(body)).into_response()
}

/// CORS layer for the dev server.
///
/// `CORS_ALLOWED_ORIGINS` is `*` or a comma-separated origin list; anything
/// unparsable falls back to allowing any origin, which is what a local dev
/// server does out of the box. Methods and headers are always permissive.
pub fn cors_layer_from_env() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{AllowOrigin, Any, CorsLayer};

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let origins: Vec<http::HeaderValue> = env_non_empty("CORS_ALLOWED_ORIGINS")
        .filter(|s| s.trim() != "*")
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .filter_map(|p| http::HeaderValue::from_str(p).ok())
                .collect()
        })
        .unwrap_or_default();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
