use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Returned on successful registration or login.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthenticatedResponse {
    pub token: Uuid,
    pub expires: DateTime<Utc>,
}
