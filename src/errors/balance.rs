use actix_web::{error, http::StatusCode};

use crate::database::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("Insufficient balance to cover this withdrawal")]
    InsufficientFunds,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl error::ResponseError for BalanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
