use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::{DatabaseError, Result};
use crate::errors::auth::AuthError;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Model {
    pub id: i32,
    pub login: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

pub async fn create(pool: &PgPool, login: &str, password: &str) -> Result<Model> {
    let password_hash = hash_password(password);

    sqlx::query_as(
        "INSERT INTO users (login, password_hash) VALUES ($1, $2)
         RETURNING id, login, password_hash, created_at",
    )
    .bind(login)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::Sqlx)
}

pub async fn fetch_by_login(pool: &PgPool, login: &str) -> Result<Option<Model>> {
    sqlx::query_as("SELECT id, login, password_hash, created_at FROM users WHERE login = $1")
        .bind(login)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::Sqlx)
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|d| d.is_unique_violation())
}

fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("argon2 hashing should not fail for a valid salt")
        .to_string()
}

/// Verify a login/password pair. Returns the user row on success, [`AuthError::AuthFailed`]
/// otherwise. We don't distinguish "no such user" from "bad password" to callers.
pub async fn verify_credentials(
    pool: &PgPool,
    login: &str,
    password: &str,
) -> std::result::Result<Model, AuthError> {
    let user = fetch_by_login(pool, login)
        .await
        .map_err(|_| AuthError::AuthFailed)?
        .ok_or(AuthError::AuthFailed)?;

    let hash = PasswordHash::new(&user.password_hash).map_err(|_| AuthError::AuthFailed)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .map_err(|_| AuthError::AuthFailed)?;

    Ok(user)
}
