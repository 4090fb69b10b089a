use actix_web::{HttpResponse, post, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;

use uuid::Uuid;

use crate::{
    AppState,
    database::user,
    errors::{GophermartError, auth::AuthError},
    models::auth::{AuthenticatedResponse, Credentials},
};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login).service(logout);
}

#[utoipa::path(
    post,
    path = "/api/user/register",
    request_body = Credentials,
    responses(
        (status = 200, description = "Registered and authenticated", body = AuthenticatedResponse),
        (status = 409, description = "Login already taken"),
    )
)]
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, GophermartError> {
    let body = body.into_inner();

    let user = match user::create(&state.pool, &body.login, &body.password).await {
        Ok(user) => user,
        Err(crate::database::DatabaseError::Sqlx(err)) if user::is_unique_violation(&err) => {
            return Err(AuthError::LoginTaken.into());
        }
        Err(err) => return Err(err.into()),
    };

    let (token, expires, _user_id) = state
        .auth
        .login(&state.pool, &user.login, &body.password)
        .await?;

    Ok(HttpResponse::Ok().json(AuthenticatedResponse { token, expires }))
}

#[utoipa::path(
    post,
    path = "/api/user/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Session information", body = AuthenticatedResponse),
        (status = 401, description = "Invalid login or password"),
    )
)]
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, GophermartError> {
    let (token, expires, _user_id) = state
        .auth
        .login(&state.pool, &body.login, &body.password)
        .await?;

    Ok(HttpResponse::Ok().json(AuthenticatedResponse { token, expires }))
}

#[utoipa::path(
    post,
    path = "/api/user/logout",
    responses((status = 200, description = "Session revoked")),
    security(("bearerAuth" = [])),
)]
#[post("/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    auth: Option<BearerAuth>,
) -> Result<HttpResponse, GophermartError> {
    let cred = auth.ok_or(AuthError::MissingBearer)?;
    let session_id = Uuid::try_parse(cred.token()).map_err(|_| AuthError::InvalidSession)?;
    state.auth.revoke(session_id)?;

    Ok(HttpResponse::Ok().finish())
}
