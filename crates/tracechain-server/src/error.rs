use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracechain_ledger::LedgerError;
use tracechain_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Ledger(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Ledger(e) if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            Self::Ledger(e) if e.is_conflict() => StatusCode::CONFLICT,
            Self::Store(e) if e.is_conflict() => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use tracechain_types::{BatchId, EventId};

    use super::*;

    #[test]
    fn status_mapping() {
        let not_found = ServerError::from(LedgerError::BatchNotFound(BatchId::new("B1").unwrap()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::from(LedgerError::DuplicateEvent(EventId::new())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(LedgerError::AppendConflict { attempts: 6 }).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServerError::from(StoreError::LockPoisoned).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn ledger_errors_keep_their_message() {
        let err = ServerError::from(LedgerError::EmptyBlock);
        assert_eq!(err.to_string(), "a block must commit at least one event");
    }
}
