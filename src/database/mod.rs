//! Thin persistence layer over Postgres. Each submodule owns one table and exposes a
//! small set of hand-written queries rather than a generic ORM; the pipeline and the
//! HTTP handlers both depend on these directly.

pub mod balance;
pub mod order;
pub mod user;
pub mod withdrawal;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
