//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires the snapshot manager, policy registry, security
//! handler, and catalog loader into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check — always `200 OK`. |
//! | `GET`  | `/admin/snapshots` | Refcount / is-latest view of retained snapshots. |
//! | `POST` | `/admin/catalog/reload` | Re-run the loader and install a new snapshot. |
//! | `ANY`  | `/*` | Resolve against the catalog and run the matched assembly. |

use crate::loader::FileCatalogLoader;
use crate::pipeline::Pipeline;
use crate::policies::InMemoryPolicyRegistry;
use crate::security::SubscriptionHandler;
use crate::snapshot::SnapshotManager;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use flowgate_kernel::{CatalogLoader, GatewayRequest, GatewayResponse, HttpMethod};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state injected into every axum handler via [`State`] extractor.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    manager: Arc<SnapshotManager>,
    loader: Arc<dyn CatalogLoader>,
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration for [`GatewayServer`].
pub struct GatewayServerConfig {
    /// TCP port to listen on (default: 3000).
    pub port: u16,
    /// Directory of catalog JSON documents.
    pub catalog_dir: String,
}

impl Default for GatewayServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            catalog_dir: "./catalog".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// High-level gateway server encapsulating pipeline, snapshot manager, and
/// catalog loader.
pub struct GatewayServer {
    config: GatewayServerConfig,
}

impl GatewayServer {
    /// Create a new server from the given configuration.
    pub fn new(config: GatewayServerConfig) -> Self {
        Self { config }
    }

    /// Build the axum [`Router`] with a freshly loaded catalog.
    ///
    /// The initial load failing is fatal: a gateway with no snapshot rejects
    /// everything, so starting without one is an operator error.
    pub async fn build_app(&self) -> std::io::Result<Router> {
        let loader: Arc<dyn CatalogLoader> =
            Arc::new(FileCatalogLoader::new(&self.config.catalog_dir));
        let manager = Arc::new(SnapshotManager::new());

        let docs = loader
            .load()
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        manager.load(docs);

        let pipeline = Pipeline::new(
            Arc::clone(&manager),
            Arc::new(InMemoryPolicyRegistry::builtin()),
            Arc::new(SubscriptionHandler),
        );

        let state = AppState {
            pipeline: Arc::new(pipeline),
            manager,
            loader,
        };

        Ok(Router::new()
            .route("/health", get(health_handler))
            .route("/admin/snapshots", get(list_snapshots_handler))
            .route("/admin/catalog/reload", post(reload_catalog_handler))
            .fallback(gateway_handler)
            .with_state(state))
    }

    /// Bind the server to `0.0.0.0:{port}` and serve until the process exits.
    pub async fn start(self) -> std::io::Result<()> {
        let app = self.build_app().await?;
        let addr = format!("0.0.0.0:{}", self.config.port);
        info!(addr = %addr, "Flowgate starting");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /health` — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "flowgate" }))
}

/// `GET /admin/snapshots` — refcount / is-latest view of retained snapshots.
async fn list_snapshots_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "snapshots": state.manager.statuses() }))
}

/// `POST /admin/catalog/reload` — re-run the loader, install a new latest
/// snapshot, and retire idle superseded ones.
async fn reload_catalog_handler(State(state): State<AppState>) -> Response {
    let docs = match state.loader.load().await {
        Ok(docs) => docs,
        Err(e) => {
            error!(error = %e, "catalog reload failed; keeping current snapshot");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };
    let snapshot = state.manager.load(docs);
    let retired = state.manager.retire_idle();
    Json(json!({
        "snapshot_id": snapshot.id(),
        "apis": snapshot.docs().apis.len(),
        "subscriptions": snapshot.docs().subscriptions.len(),
        "retired": retired,
    }))
    .into_response()
}

/// Catch-all gateway handler — converts the axum request and hands it to the
/// pipeline.
async fn gateway_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(http_method) = HttpMethod::from_str_ci(method.as_str()) else {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": format!("method '{method}' is not supported") })),
        )
            .into_response();
    };
    let request_id = Uuid::new_v4().to_string();

    let mut req = GatewayRequest::new(&request_id, uri.path(), http_method);
    for (name, value) in &headers {
        if let Ok(v) = value.to_str() {
            req = req.with_header(name.as_str(), v);
        }
    }
    if let Some(query) = uri.query() {
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some((k, v)) => req = req.with_query(k, v),
                None if !pair.is_empty() => req = req.with_query(pair, ""),
                None => {}
            }
        }
    }
    req = req.with_body(body.to_vec());

    build_axum_response(state.pipeline.handle(&req).await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn build_axum_response(resp: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = axum::response::Response::builder().status(status);
    for (k, v) in &resp.headers {
        builder = builder.header(k, v);
    }
    builder
        .body(axum::body::Body::from(resp.body))
        .unwrap_or_else(|_| status.into_response())
}
