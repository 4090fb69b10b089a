use actix_web::HttpResponse;

use crate::errors::GophermartError;

#[allow(clippy::unused_async)]
pub async fn not_found() -> Result<HttpResponse, GophermartError> {
    Err(GophermartError::NotFound)
}
