use actix_web::{error, http::StatusCode};

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum AuthError {
    #[error("Missing bearer auth token in header")]
    MissingBearer,
    #[error("Invalid login or password")]
    AuthFailed,
    #[error("A user with that login already exists")]
    LoginTaken,
    #[error("The provided token either does not exist, or has expired")]
    InvalidSession,
}

impl error::ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingBearer | Self::InvalidSession => StatusCode::UNAUTHORIZED,
            Self::AuthFailed => StatusCode::UNAUTHORIZED,
            Self::LoginTaken => StatusCode::CONFLICT,
        }
    }
}
