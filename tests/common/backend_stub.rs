#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// What the stub saw for one request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Stand-in for the inference backend.
///
/// `GET /health` answers a fixed document, `GET /boom` answers 500 with a
/// plain-text body, `/moved` redirects to `/landing` with a 302, and
/// everything else echoes the request back as JSON.
#[derive(Clone)]
pub struct BackendStub {
    pub base_url: String,
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    shutdown: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl BackendStub {
    pub async fn start() -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route("/health", get(health))
            .route("/boom", get(boom))
            .route("/moved", any(moved))
            .route("/landing", any(landing))
            .fallback(echo)
            .with_state(seen.clone());

        let (addr, tx) = spawn_router(router).await;
        BackendStub {
            base_url: format!("http://{}", addr),
            addr,
            seen,
            shutdown: Arc::new(Mutex::new(Some(tx))),
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("stub lock").clone()
    }

    pub fn last_request(&self) -> SeenRequest {
        self.requests().pop().expect("stub saw no request")
    }

    pub fn shutdown(&self) {
        if let Some(tx) = self.shutdown.lock().expect("stub lock").take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for BackendStub {
    fn drop(&mut self) {
        if Arc::strong_count(&self.shutdown) == 1 {
            self.shutdown();
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "models": ["custom"],
        "conf_th": 0.25,
        "iou_th": 0.45,
        "min_mask_area": 50
    }))
}

async fn boom() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

type Seen = Arc<Mutex<Vec<SeenRequest>>>;

async fn record(seen: &Seen, req: Request) -> SeenRequest {
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    let entry = SeenRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    };
    seen.lock().expect("stub lock").push(entry.clone());
    entry
}

async fn moved(State(seen): State<Seen>, req: Request) -> impl IntoResponse {
    record(&seen, req).await;
    (StatusCode::FOUND, [(header::LOCATION, "/landing")], "moved")
}

async fn landing(State(seen): State<Seen>, req: Request) -> impl IntoResponse {
    record(&seen, req).await;
    "landed"
}

async fn echo(State(seen): State<Seen>, req: Request) -> impl IntoResponse {
    let seen_req = record(&seen, req).await;
    let host = seen_req
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let doc = serde_json::json!({
        "method": seen_req.method.as_str(),
        "path": seen_req.uri.path(),
        "query": seen_req.uri.query(),
        "host": host,
        "body_len": seen_req.body.len(),
    });
    (
        StatusCode::OK,
        [("x-backend", "stub")],
        Json(doc),
    )
}

/// Serve `router` on an ephemeral local port until the sender fires.
pub async fn spawn_router(router: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = oneshot::channel::<()>();

    let server = axum::serve(listener, router.into_make_service());
    tokio::spawn(async move {
        tokio::select! {
            res = server => {
                if let Err(err) = res {
                    eprintln!("Stub server error: {err:?}");
                }
            }
            _ = rx => {}
        }
    });

    (addr, tx)
}

/// A running dev server plus a client aimed at it.
pub struct DevServer {
    pub base_url: String,
    join: JoinHandle<()>,
    pub client: reqwest::Client,
}

impl DevServer {
    /// Dev server forwarding through a client that leaves redirects alone,
    /// like the production proxy client.
    pub async fn spawn(config: tumorscope::DevServerConfig) -> Self {
        let app = tumorscope::dev_server::build_router_with_client(config, no_redirect_client());
        Self::serve(app).await
    }

    pub async fn serve(app: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let server = axum::serve(listener, app.into_make_service());
        let join = tokio::spawn(async move {
            if let Err(e) = server.await {
                eprintln!("Dev server error: {e:?}");
            }
        });
        DevServer {
            base_url: format!("http://{}", addr),
            join,
            client: no_redirect_client(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// reqwest client for tests: no system proxy, bounded wait.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed building reqwest client")
}

/// Like [`test_client`] but hands 3xx responses back instead of following them.
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed building reqwest client")
}

/// A prediction body carrying every key the smoke test requires.
pub fn full_prediction() -> serde_json::Value {
    serde_json::json!({
        "filename": "x.jpg",
        "model_used": "custom",
        "conf_th": 0.5,
        "iou_th": 0.5,
        "min_mask_area": 10,
        "has_tumor": true,
        "confidence": 0.87,
        "overlay_image": "aGVsbG8="
    })
}
