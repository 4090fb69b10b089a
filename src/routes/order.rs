use actix_web::{HttpResponse, get, post, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;

use crate::{
    AppState,
    auth::check_bearer,
    database::order::{self, AdmissionOutcome},
    errors::{GophermartError, order::OrderError},
    models::order::OrderJson,
    utils::is_valid_order_number,
};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(submit).service(list);
}

#[utoipa::path(
    post,
    path = "/api/user/orders",
    request_body(content = String, content_type = "text/plain"),
    responses(
        (status = 202, description = "New order accepted"),
        (status = 200, description = "Already submitted by this user"),
        (status = 409, description = "Already submitted by another user"),
        (status = 422, description = "Order number fails the Luhn check"),
    ),
    security(("bearerAuth" = [])),
)]
#[post("/orders")]
pub async fn submit(
    state: web::Data<AppState>,
    auth: Option<BearerAuth>,
    body: web::Bytes,
) -> Result<HttpResponse, GophermartError> {
    let user_id = check_bearer(&state.auth, auth).await?;

    let number: i64 = std::str::from_utf8(&body)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or(GophermartError::BadRequest)?;

    if !is_valid_order_number(number) {
        return Err(OrderError::InvalidNumber.into());
    }

    match order::submit(&state.pool, user_id, number).await? {
        AdmissionOutcome::Accepted => {
            state.pipeline.enqueue(number);
            Ok(HttpResponse::Accepted().finish())
        }
        AdmissionOutcome::AlreadyYours => Ok(HttpResponse::Ok().finish()),
        AdmissionOutcome::ConflictOtherUser => Err(OrderError::ConflictOtherUser.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/user/orders",
    responses(
        (status = 200, description = "Orders for the caller", body = [OrderJson]),
        (status = 204, description = "No orders yet"),
    ),
    security(("bearerAuth" = [])),
)]
#[get("/orders")]
pub async fn list(
    state: web::Data<AppState>,
    auth: Option<BearerAuth>,
) -> Result<HttpResponse, GophermartError> {
    let user_id = check_bearer(&state.auth, auth).await?;

    let orders = order::list_by_user(&state.pool, user_id).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }

    let body: Vec<OrderJson> = orders.into_iter().map(OrderJson::from).collect();

    Ok(HttpResponse::Ok().json(body))
}
