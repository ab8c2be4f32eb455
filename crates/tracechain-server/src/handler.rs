use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracechain_ledger::{
    AuditEntry, BlockPage, EventProof, Ledger, LedgerResult, RecordOutcome, TraceView,
    VerificationReport,
};
use tracechain_store::LedgerStore;
use tracechain_types::{Actor, BatchId, EventId, NewEvent};

use crate::error::{ServerError, ServerResult};

/// Shared handler state.
pub struct AppState<S> {
    pub ledger: Arc<Ledger<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<S: LedgerStore + 'static> AppState<S> {
    pub fn new(ledger: Arc<Ledger<S>>) -> Self {
        Self { ledger }
    }

    /// Run a ledger call on the blocking pool; stores may do file I/O.
    async fn run<T, F>(&self, f: F) -> ServerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Ledger<S>) -> LedgerResult<T> + Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || f(&ledger))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?
            .map_err(ServerError::from)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub signer: String,
    pub blocks: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub batch_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub batch_id: BatchId,
    pub events: Vec<AuditEntry>,
}

/// Events produced by one domain action; committed together in one block.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordRequest {
    pub events: Vec<NewEvent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActorRequest {
    pub name: String,
}

fn parse_batch(raw: &str) -> ServerResult<BatchId> {
    BatchId::new(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
) -> ServerResult<Json<InfoResponse>> {
    let signer = state.ledger.config().signer.clone();
    let blocks = state.run(|ledger| ledger.block_count()).await?;
    Ok(Json(InfoResponse {
        name: "tracechain-server".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        signer,
        blocks,
    }))
}

/// `GET /v1/trace/:batch_id`
pub async fn trace_handler<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Path(batch_id): Path<String>,
) -> ServerResult<Json<TraceView>> {
    let batch = parse_batch(&batch_id)?;
    let view = state.run(move |ledger| ledger.trace(&batch)).await?;
    Ok(Json(view))
}

/// `GET /v1/blocks?page=&limit=`
pub async fn blocks_handler<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
) -> ServerResult<Json<BlockPage>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(0);
    let blocks = state.run(move |ledger| ledger.blocks_page(page, limit)).await?;
    Ok(Json(blocks))
}

/// `GET /v1/blocks/verify`
pub async fn verify_handler<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
) -> ServerResult<Json<VerificationReport>> {
    let report = state.run(|ledger| ledger.verify()).await?;
    Ok(Json(report))
}

/// `GET /v1/audit?batch_id=`
pub async fn audit_handler<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<AuditQuery>,
) -> ServerResult<Json<AuditResponse>> {
    let raw = query
        .batch_id
        .ok_or_else(|| ServerError::BadRequest("batch_id query parameter is required".into()))?;
    let batch_id = parse_batch(&raw)?;
    let batch = batch_id.clone();
    let events = state.run(move |ledger| ledger.audit(&batch)).await?;
    Ok(Json(AuditResponse { batch_id, events }))
}

/// `GET /v1/events/:event_id/proof`
pub async fn proof_handler<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Path(event_id): Path<String>,
) -> ServerResult<Json<EventProof>> {
    let id = EventId::parse(&event_id).map_err(|e| ServerError::BadRequest(e.to_string()))?;
    let proof = state.run(move |ledger| ledger.prove_event(&id)).await?;
    Ok(Json(proof))
}

/// `POST /v1/events`
pub async fn record_handler<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Json(request): Json<RecordRequest>,
) -> ServerResult<(StatusCode, Json<RecordOutcome>)> {
    let outcome = state.run(move |ledger| ledger.record(request.events)).await?;
    tracing::info!(
        block = outcome.block.index,
        events = outcome.events.len(),
        "events recorded"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `POST /v1/actors`
pub async fn actor_handler<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Json(request): Json<ActorRequest>,
) -> ServerResult<(StatusCode, Json<Actor>)> {
    if request.name.trim().is_empty() {
        return Err(ServerError::BadRequest("actor name must not be empty".into()));
    }
    let actor = state
        .run(move |ledger| ledger.register_actor(&request.name))
        .await?;
    Ok((StatusCode::CREATED, Json(actor)))
}
