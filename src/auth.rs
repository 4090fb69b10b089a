//! Bearer-token sessions for the HTTP boundary. Order admission, balance, and
//! withdrawal semantics (the pipeline's actual concern) don't depend on any of this;
//! it only decides which `user_id` an incoming request acts as.

use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use sqlx::PgPool;
use utoipa::openapi::security::{Http, SecurityScheme};
use uuid::Uuid;

use crate::{database::user, errors::auth::AuthError};

#[derive(Debug, Clone, Default)]
pub struct AuthSessions {
    sessions: DashMap<Uuid, (i32, DateTime<Utc>)>,
}

impl AuthSessions {
    /// Removes expired sessions.
    pub fn vacuum(&self) {
        let current_time = Utc::now();

        self.sessions.retain(|_, (_, exp)| *exp > current_time);
    }

    fn register(&self, user_id: i32) -> (Uuid, DateTime<Utc>) {
        let id = Uuid::new_v4();
        let exp = Utc::now() + TimeDelta::hours(1);

        self.sessions.insert(id, (user_id, exp));

        (id, exp)
    }

    /// Verify a login/password pair against the store and, on success, start a session.
    pub async fn login(
        &self,
        db: &PgPool,
        login: &str,
        password: &str,
    ) -> Result<(Uuid, DateTime<Utc>, i32), AuthError> {
        let user = user::verify_credentials(db, login, password).await?;
        let (id, exp) = self.register(user.id);

        Ok((id, exp, user.id))
    }

    /// Revokes an active session, returning the `user_id` if there was one.
    pub fn revoke(&self, id: Uuid) -> Result<i32, AuthError> {
        self.sessions
            .remove(&id)
            .map(|(_, (user_id, _))| user_id)
            .ok_or(AuthError::InvalidSession)
    }

    /// Returns the `user_id` a session belongs to, pruning it first if expired.
    pub fn user_id(&self, id: Uuid) -> Option<i32> {
        let entry = self.sessions.get(&id)?;
        let (user_id, exp) = *entry.value();
        drop(entry);

        if exp <= Utc::now() {
            self.sessions.remove(&id);
            None
        } else {
            Some(user_id)
        }
    }
}

pub async fn check_bearer(
    sessions: &AuthSessions,
    cred: Option<BearerAuth>,
) -> Result<i32, AuthError> {
    let Some(cred) = cred else {
        return Err(AuthError::MissingBearer);
    };

    let id = Uuid::try_parse(cred.token()).map_err(|_| AuthError::InvalidSession)?;

    sessions.user_id(id).ok_or(AuthError::InvalidSession)
}

pub struct AuthAddon;

impl utoipa::Modify for AuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(utoipa::openapi::security::HttpAuthScheme::Bearer)),
        );
    }
}
