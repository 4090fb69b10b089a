use actix_web::{HttpResponse, get, post, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;

use crate::{
    AppState,
    auth::check_bearer,
    database::{balance, order, withdrawal},
    errors::{GophermartError, order::OrderError},
    models::{
        balance::{BalanceResponse, WithdrawRequest},
        withdrawal::WithdrawalJson,
    },
    utils::is_valid_order_number,
};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(get_balance).service(withdraw).service(withdrawals);
}

#[utoipa::path(
    get,
    path = "/api/user/balance",
    responses((status = 200, description = "Current balance", body = BalanceResponse)),
    security(("bearerAuth" = [])),
)]
#[get("/balance")]
pub async fn get_balance(
    state: web::Data<AppState>,
    auth: Option<BearerAuth>,
) -> Result<HttpResponse, GophermartError> {
    let user_id = check_bearer(&state.auth, auth).await?;

    let model = balance::fetch_or_create(&state.pool, user_id).await?;

    Ok(HttpResponse::Ok().json(BalanceResponse::from(model)))
}

#[utoipa::path(
    post,
    path = "/api/user/balance/withdraw",
    request_body = WithdrawRequest,
    responses(
        (status = 200, description = "Withdrawal accepted"),
        (status = 402, description = "Insufficient balance"),
        (status = 422, description = "Order number fails the Luhn check"),
    ),
    security(("bearerAuth" = [])),
)]
#[post("/balance/withdraw")]
pub async fn withdraw(
    state: web::Data<AppState>,
    auth: Option<BearerAuth>,
    body: web::Json<WithdrawRequest>,
) -> Result<HttpResponse, GophermartError> {
    let user_id = check_bearer(&state.auth, auth).await?;
    let body = body.into_inner();

    let number: i64 = body.order.parse().map_err(|_| GophermartError::BadRequest)?;
    if !is_valid_order_number(number) {
        return Err(OrderError::InvalidNumber.into());
    }

    // A withdrawal's target order is admitted the same way a submitted order is, so
    // it enters the processing pipeline even if the caller never calls `/orders`.
    match order::submit(&state.pool, user_id, number).await? {
        crate::database::order::AdmissionOutcome::ConflictOtherUser => {
            return Err(OrderError::ConflictOtherUser.into());
        }
        crate::database::order::AdmissionOutcome::Accepted => state.pipeline.enqueue(number),
        crate::database::order::AdmissionOutcome::AlreadyYours => {}
    }

    balance::withdraw(&state.pool, user_id, number, body.sum).await?;

    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    get,
    path = "/api/user/withdrawals",
    responses(
        (status = 200, description = "Withdrawal history", body = [WithdrawalJson]),
        (status = 204, description = "No withdrawals yet"),
    ),
    security(("bearerAuth" = [])),
)]
#[get("/withdrawals")]
pub async fn withdrawals(
    state: web::Data<AppState>,
    auth: Option<BearerAuth>,
) -> Result<HttpResponse, GophermartError> {
    let user_id = check_bearer(&state.auth, auth).await?;

    let rows = withdrawal::list_by_user(&state.pool, user_id).await?;
    if rows.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }

    let body: Vec<WithdrawalJson> = rows.into_iter().map(WithdrawalJson::from).collect();

    Ok(HttpResponse::Ok().json(body))
}
