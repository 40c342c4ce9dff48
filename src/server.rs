//! ==============================================================================
//! server.rs - hub web server (ingestion api, query api, dashboard)
//! ==============================================================================
//!
//! purpose:
//!     exposes the reading store over http:
//!
//!     POST /api/sensor-data          json body  -> stored reading
//!     GET  /api/sensor-data?...      query      -> stored reading
//!     GET  /api/data?limit=N                    -> newest readings + total
//!     GET  /api/data/:device_id?limit=N         -> newest readings for one device
//!     GET  /api/stats                           -> aggregate statistics
//!     GET  /api/health                          -> liveness for nodes
//!     GET  /                                    -> dashboard page (polls the api)
//!
//!     every api response is a `{ "success": .. }` envelope.
//!
//! concurrency:
//!     the store sits behind one async mutex. an append moves its owned guard
//!     into the blocking snapshot write, so ids, eviction and the file on disk
//!     always move together, even if the request future is dropped mid-save.
//!     reads take the same lock briefly.
//!
//!     ┌────────────┐  ingest   ┌──────────────────────┐  save  ┌──────────────┐
//!     │ sensor     │ ────────► │ Hub                  │ ─────► │ SnapshotFile │
//!     │ nodes      │           │  Mutex<ReadingStore> │        │ (json file)  │
//!     └────────────┘           └──────────┬───────────┘        └──────────────┘
//!                                         │ query
//!                              ┌──────────┴───────────┐
//!                              │ dashboard / clients  │
//!                              └──────────────────────┘
//!
//! relationships:
//!     - uses: store.rs, ingest.rs, snapshot.rs, error.rs
//!     - used by: main.rs (hub role), tests/api.rs
//!
//! ==============================================================================

use crate::config::HubConfig;
use crate::domain::{Reading, ReadingCandidate};
use crate::error::{HubError, ValidationError};
use crate::ingest::{parse_limit, BodyPayload, QueryPayload};
use crate::snapshot::SnapshotFile;
use crate::store::ReadingStore;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

const DASHBOARD_HTML: &str = include_str!("../static/dashboard.html");

// ==============================================================================
// shared state
// ==============================================================================

/// handle to the store and its snapshot, cheap to clone into handlers
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    store: Arc<Mutex<ReadingStore>>,
    snapshot: SnapshotFile,
    default_limit: usize,
    show_sensor_data: bool,
    started: Instant,
}

impl Hub {
    pub fn new(store: ReadingStore, snapshot: SnapshotFile, config: &HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                store: Arc::new(Mutex::new(store)),
                snapshot,
                default_limit: config.api.default_limit,
                show_sensor_data: config.logging.show_sensor_data,
                started: Instant::now(),
            }),
        }
    }

    /// build the store from config and hydrate it from the snapshot, if any
    pub fn open(config: &HubConfig) -> Self {
        let snapshot = SnapshotFile::new(&config.storage.data_file);
        let mut store = ReadingStore::with_capacity(config.storage.max_retained);
        store.replace_all(snapshot.load_or_empty());
        Self::new(store, snapshot, config)
    }

    /// append a validated reading and persist the new sequence
    pub async fn ingest(&self, candidate: ReadingCandidate) -> Reading {
        let mut store = self.inner.store.clone().lock_owned().await;
        let reading = store.append(candidate);

        if self.inner.show_sensor_data {
            tracing::info!(
                "[INGEST] #{} {} | Temp: {:.1}°C | Humidity: {:.1}% | {}",
                reading.id,
                reading.device_id,
                reading.temperature,
                reading.humidity,
                reading.location
            );
        }

        self.save_locked(store).await;
        reading
    }

    /// write the current sequence out; used at shutdown
    pub async fn flush(&self) {
        let store = self.inner.store.clone().lock_owned().await;
        let count = store.len();
        self.save_locked(store).await;
        tracing::info!("[SHUTDOWN] Flushed {} readings to {}", count, self.inner.snapshot.path().display());
    }

    /// the guard is released only once the write has finished
    async fn save_locked(&self, store: OwnedMutexGuard<ReadingStore>) {
        let snapshot = self.inner.snapshot.clone();
        let save = tokio::task::spawn_blocking(move || {
            let result = snapshot.save(&store.to_vec());
            drop(store);
            result
        });
        match save.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("[SNAPSHOT] save failed, keeping in-memory data: {}", e),
            Err(e) => tracing::error!("[SNAPSHOT] save task failed: {}", e),
        }
    }

    pub async fn recent(&self, limit: usize) -> (Vec<Reading>, usize) {
        let store = self.inner.store.lock().await;
        (store.recent(limit), store.len())
    }

    pub async fn by_device(&self, device_id: &str, limit: usize) -> Vec<Reading> {
        self.inner.store.lock().await.by_device(device_id, limit)
    }

    pub async fn stats(&self) -> Option<crate::domain::Stats> {
        self.inner.store.lock().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.inner.store.lock().await.len()
    }

    fn limit(&self, raw: Option<&str>) -> usize {
        parse_limit(raw, self.inner.default_limit)
    }
}

// ==============================================================================
// web server
// ==============================================================================

pub fn router(hub: Hub) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/sensor-data", get(ingest_query_handler).post(ingest_body_handler))
        .route("/api/data", get(list_handler))
        .route("/api/data/:device_id", get(device_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/health", get(health_handler))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .with_state(hub)
}

/// serve until `shutdown` resolves, then flush the snapshot one last time
pub async fn serve<F>(listener: tokio::net::TcpListener, hub: Hub, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(hub.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;
    hub.flush().await;
    Ok(())
}

/// resolves on ctrl-c, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[SHUTDOWN] failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("[SHUTDOWN] failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("[SHUTDOWN] signal received, draining requests");
}

// ==============================================================================
// handlers
// ==============================================================================

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<String>,
}

async fn dashboard_handler() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// POST /api/sensor-data
async fn ingest_body_handler(
    State(hub): State<Hub>,
    payload: Result<Json<BodyPayload>, JsonRejection>,
) -> Result<Json<Value>, HubError> {
    let Json(payload) = payload.map_err(|e| ValidationError::MalformedRequest(e.body_text()))?;
    let reading = hub.ingest(payload.into_candidate()?).await;
    Ok(Json(json!({
        "success": true,
        "message": "Data received successfully",
        "data": reading,
    })))
}

/// GET /api/sensor-data?device_id=..&temperature=..&humidity=..
async fn ingest_query_handler(
    State(hub): State<Hub>,
    query: Result<Query<QueryPayload>, QueryRejection>,
) -> Result<Json<Value>, HubError> {
    let Query(query) = query.map_err(|e| ValidationError::MalformedRequest(e.body_text()))?;
    let reading = hub.ingest(query.into_candidate()?).await;
    Ok(Json(json!({
        "success": true,
        "message": "Data received successfully",
        "data": reading,
    })))
}

/// unreadable query strings fall back to the default limit
fn requested_limit(query: Result<Query<LimitQuery>, QueryRejection>) -> Option<String> {
    query.ok().and_then(|Query(q)| q.limit)
}

/// GET /api/data?limit=N
async fn list_handler(
    State(hub): State<Hub>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Json<Value> {
    let (data, total) = hub.recent(hub.limit(requested_limit(query).as_deref())).await;
    Json(json!({
        "success": true,
        "count": data.len(),
        "total": total,
        "data": data,
    }))
}

/// GET /api/data/:device_id?limit=N
async fn device_handler(
    State(hub): State<Hub>,
    Path(device_id): Path<String>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Json<Value> {
    let data = hub.by_device(&device_id, hub.limit(requested_limit(query).as_deref())).await;
    Json(json!({
        "success": true,
        "device_id": device_id,
        "count": data.len(),
        "data": data,
    }))
}

/// GET /api/stats
async fn stats_handler(State(hub): State<Hub>) -> Json<Value> {
    match hub.stats().await {
        Some(stats) => Json(json!({ "success": true, "stats": stats })),
        None => Json(json!({
            "success": true,
            "message": "No data available",
            "stats": {},
        })),
    }
}

/// GET /api/health
async fn health_handler(State(hub): State<Hub>) -> Json<Value> {
    Json(json!({
        "success": true,
        "readings": hub.len().await,
        "uptime_seconds": hub.inner.started.elapsed().as_secs(),
    }))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());
    HubError::Unexpected(detail).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn panic_response_is_a_generic_envelope() {
        let response = panic_response(Box::new("db password is hunter2".to_string()));
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body, json!({ "success": false, "error": "Internal server error" }));
        assert!(!body.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn panicking_handler_is_caught_at_the_boundary() {
        let app = Router::new()
            .route("/boom", get(|| async { panic!("secret internals") as () }))
            .route("/ok", get(|| async { "ok" }))
            .layer(CatchPanicLayer::custom(panic_response));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let client = reqwest::Client::new();
        let response = client.get(format!("http://{}/boom", addr)).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("secret"));

        // the process keeps serving after the panic
        let response = client.get(format!("http://{}/ok", addr)).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200);

        server.abort();
    }
}
