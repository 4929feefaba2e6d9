//! API Handlers
//!
//! HTTP request handlers for each cache service endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::batch::BatchExecutor;
use crate::cache::{connect_backend, Backend, CacheAside};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    BatchSetRequest, BatchSetResponse, DeleteResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside store over the configured backend
    pub cache: Arc<CacheAside>,
    /// Executor used for batch writes
    pub executor: BatchExecutor,
}

impl AppState {
    /// Creates a new AppState with the given cache and executor.
    pub fn new(cache: CacheAside, executor: BatchExecutor) -> Self {
        Self {
            cache: Arc::new(cache),
            executor,
        }
    }

    /// Creates a new AppState over an explicit backend with default settings.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self::from_parts(backend, &Config::default())
    }

    /// Creates a new AppState from configuration.
    ///
    /// Picks the backend from the configured connection string.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = connect_backend(config)?;
        Ok(Self::from_parts(backend, config))
    }

    fn from_parts(backend: Arc<dyn Backend>, config: &Config) -> Self {
        Self::new(
            CacheAside::from_config(backend, config),
            BatchExecutor::from_config(config),
        )
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value with optional TTL; a `null` value deletes the key.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let stored = state.cache.set(&req.key, &req.value, req.ttl()).await?;

    Ok(Json(SetResponse::new(req.key, stored)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get::<Value>(&key).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deletes a key from the cache.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let removed = state.cache.delete(&key).await?;

    Ok(Json(DeleteResponse::new(key, removed)))
}

/// Handler for POST /batch/set
///
/// Writes every entry through the batch executor. The first failing write
/// fails the request.
pub async fn batch_set_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchSetRequest>,
) -> Result<Json<BatchSetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let requested = req.entries.len();
    let cache = state.cache.clone();

    let outcomes = state
        .executor
        .run(req.entries, |entry, _| {
            let cache = cache.clone();
            async move { cache.set(&entry.key, &entry.value, entry.ttl()).await }
        })
        .await?;

    let stored = outcomes.into_iter().filter(|stored| *stored).count();
    info!("Batch write: {} of {} entries stored", stored, requested);

    Ok(Json(BatchSetResponse { requested, stored }))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.backend().kind(),
        state.cache.stats(),
    ))
}

/// Handler for GET /health
///
/// Returns health status of the service.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.backend().kind()))
}
