pub mod auth;
pub mod balance;
pub mod not_found;
pub mod order;

use actix_web::{middleware, web};

use crate::errors::GophermartError;

pub fn config(cfg: &mut web::ServiceConfig) {
    let json_cfg = web::JsonConfig::default()
        .error_handler(|_err, _req| GophermartError::BadRequest.into());

    cfg.service(
        web::scope("/api/user")
            .wrap(middleware::NormalizePath::trim())
            .app_data(json_cfg)
            .configure(auth::config)
            .configure(order::config)
            .configure(balance::config),
    );
}
