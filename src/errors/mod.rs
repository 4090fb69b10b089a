pub mod auth;
pub mod balance;
pub mod order;

use actix_web::{HttpResponse, error, http::StatusCode};

use crate::database::DatabaseError;
use crate::errors::{auth::AuthError, balance::BalanceError, order::OrderError};

/// Top-level error type the HTTP handlers return. Every variant knows how to map
/// itself to a status code; database errors are never surfaced to the caller beyond
/// a bare 500, matching the propagation policy in the design: the pipeline never
/// leaks storage detail across the admission boundary.
#[derive(Debug, thiserror::Error)]
pub enum GophermartError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Balance(#[from] BalanceError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("invalid request body")]
    BadRequest,
    #[error("resource not found")]
    NotFound,
}

impl error::ResponseError for GophermartError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(e) => e.status_code(),
            Self::Order(e) => e.status_code(),
            Self::Balance(e) => e.status_code(),
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Database(err) => tracing::error!("database error: {err}"),
            Self::Balance(BalanceError::Database(err)) => tracing::error!("database error: {err}"),
            _ => {}
        }

        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}
