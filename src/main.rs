use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use gophermart::{
    AppState,
    auth::{AuthAddon, AuthSessions},
    config::Config,
    models, pipeline::OrderPipeline, routes,
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::load();

    let pool = PgPoolOptions::new()
        .max_connections(config.wp_conns)
        .connect(&config.database_uri)
        .await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations completed successfully");

    let pipeline = OrderPipeline::start(
        pool.clone(),
        config.database_uri.clone(),
        config.accrual_system_address.clone(),
        config.workers,
    );

    let state = web::Data::new(AppState {
        pool,
        auth: AuthSessions::default(),
        pipeline,
    });

    #[derive(OpenApi)]
    #[openapi(
        paths(
            routes::auth::register,
            routes::auth::login,
            routes::auth::logout,
            routes::order::submit,
            routes::order::list,
            routes::balance::get_balance,
            routes::balance::withdraw,
            routes::balance::withdrawals,
        ),
        components(schemas(
            models::auth::Credentials,
            models::auth::AuthenticatedResponse,
            models::order::OrderJson,
            models::balance::BalanceResponse,
            models::balance::WithdrawRequest,
            models::withdrawal::WithdrawalJson,
        )),
        modifiers(&AuthAddon),
    )]
    struct ApiDocs;

    let bind_address = config.run_address.clone();
    let shutdown_state = state.clone();

    let http_server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(["GET", "POST"])
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#,
            ))
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .service(web::redirect("/swagger-ui", "/swagger-ui/"))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDocs::openapi()),
            )
            .configure(routes::config)
            .default_service(web::route().to(routes::not_found::not_found))
    })
    .bind(&bind_address)?
    .run();

    let server_handle = http_server.handle();

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        result = http_server => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining the pipeline");
            server_handle.stop(true).await;
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, draining the pipeline");
            server_handle.stop(true).await;
        }
    }

    shutdown_state.pipeline.stop().await;

    Ok(())
}
