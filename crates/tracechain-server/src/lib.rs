//! HTTP server for Tracechain.
//!
//! Exposes event ingestion, the public batch trace, block listing, chain
//! verification, audit trails, and inclusion proofs over a JSON API.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use router::build_router;
pub use server::TracechainServer;
