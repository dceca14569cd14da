use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::TryStreamExt;
use http::{header, HeaderMap, StatusCode};
use http_body_util::LengthLimitError;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::proxy::{DevServerConfig, ProxyRule};
use crate::util::{build_proxy_http_client, cors_layer_from_env, error_response};

const HOP_BY_HOP: [header::HeaderName; 9] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
    header::HOST,
];

struct DevServerState {
    config: DevServerConfig,
    http: reqwest::Client,
    assets: Option<ServeDir<ServeFile>>,
}

#[derive(Debug, Error)]
enum ForwardError {
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error("failed to read request body: {0}")]
    Body(axum::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("invalid upstream response: {0}")]
    Response(#[from] http::Error),
}

impl ForwardError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Response(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn from_body(err: axum::Error, limit: usize) -> Self {
        if is_length_limit(&err) {
            Self::BodyTooLarge(limit)
        } else {
            Self::Body(err)
        }
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Build the dev/preview router: proxy rules first, then the static root.
pub fn build_router(config: DevServerConfig) -> Router {
    build_router_with_client(config, build_proxy_http_client())
}

/// Same as [`build_router`], forwarding through `http`. The client should
/// not follow redirects, see [`build_proxy_http_client`].
pub fn build_router_with_client(config: DevServerConfig, http: reqwest::Client) -> Router {
    let assets = config.static_dir.as_ref().map(|dir| {
        // SPA fallback: unknown paths get the app shell.
        ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")))
    });
    let state = Arc::new(DevServerState {
        config,
        http,
        assets,
    });

    Router::new().fallback(dispatch).with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer_from_env()),
    )
}

/// Bind `host:port` from the config and serve until the process exits.
pub async fn serve(config: DevServerConfig) -> std::io::Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        "tumorscope {} server listening on http://{}",
        config.mode.as_str(),
        addr
    );
    for rule in &config.proxy {
        tracing::info!("proxy {}* -> {}", rule.prefix, rule.target);
    }
    match &config.static_dir {
        Some(dir) => tracing::info!("serving static files from {}", dir.display()),
        None => tracing::info!("no static root configured"),
    }

    axum::serve(listener, build_router(config)).await
}

async fn dispatch(State(state): State<Arc<DevServerState>>, req: Request) -> Response {
    let path = req.uri().path().to_owned();

    if let Some(rule) = state.config.rule_for(&path) {
        return match forward(&state.http, rule, state.config.max_body_bytes, req).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, path = %path, target = %rule.target, "proxy error");
                error_response(e.status(), &e.to_string())
            }
        };
    }

    match state.assets.clone() {
        Some(assets) => match assets.oneshot(req).await {
            Ok(resp) => resp.into_response(),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        },
        None => error_response(StatusCode::NOT_FOUND, &format!("no route for {path}")),
    }
}

async fn forward(
    client: &reqwest::Client,
    rule: &ProxyRule,
    max_body_bytes: usize,
    req: Request,
) -> Result<Response, ForwardError> {
    let (parts, body) = req.into_parts();
    let url = rule.upstream_url(parts.uri.path(), parts.uri.query());
    let body = axum::body::to_bytes(body, max_body_bytes)
        .await
        .map_err(|e| ForwardError::from_body(e, max_body_bytes))?;

    let mut headers = strip_hop_by_hop(&parts.headers);
    if !rule.change_origin {
        if let Some(host) = parts.headers.get(header::HOST) {
            headers.insert(header::HOST, host.clone());
        }
    }

    tracing::debug!(method = %parts.method, from = %parts.uri, to = %url, "forwarding");

    let upstream = client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await?;

    let status = upstream.status();
    let headers = strip_hop_by_hop(upstream.headers());
    let stream = upstream
        .bytes_stream()
        .map_err(|e| std::io::Error::other(e.to_string()));

    let mut builder = http::Response::builder().status(status);
    if let Some(h) = builder.headers_mut() {
        *h = headers;
    }
    Ok(builder.body(Body::from_stream(stream))?)
}

/// Copy `headers` without hop-by-hop fields, including any named in
/// `Connection`. `Host` and `Content-Length` are dropped too; the client
/// layer recomputes them.
fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    let listed: Vec<header::HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| header::HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();
    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        out.remove(name);
    }
    out.remove("keep-alive");
    out
}
