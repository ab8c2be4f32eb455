use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracechain_store::LedgerStore;

use crate::handler::{self, AppState};

/// Build the axum router with all Tracechain endpoints.
pub fn build_router<S: LedgerStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler::<S>))
        .route("/v1/trace/:batch_id", get(handler::trace_handler::<S>))
        .route("/v1/blocks", get(handler::blocks_handler::<S>))
        .route("/v1/blocks/verify", get(handler::verify_handler::<S>))
        .route("/v1/audit", get(handler::audit_handler::<S>))
        .route("/v1/events", post(handler::record_handler::<S>))
        .route("/v1/events/:event_id/proof", get(handler::proof_handler::<S>))
        .route("/v1/actors", post(handler::actor_handler::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
