use actix_web::{error, http::StatusCode};

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum OrderError {
    #[error("Order number failed the Luhn checksum")]
    InvalidNumber,
    #[error("This order was already uploaded by another user")]
    ConflictOtherUser,
}

impl error::ResponseError for OrderError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidNumber => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ConflictOtherUser => StatusCode::CONFLICT,
        }
    }
}
