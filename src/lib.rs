pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod utils;

use sqlx::PgPool;

use auth::AuthSessions;
use pipeline::OrderPipeline;

/// Shared application state handed to every actix-web worker thread.
pub struct AppState {
    pub pool: PgPool,
    pub auth: AuthSessions,
    pub pipeline: OrderPipeline,
}
