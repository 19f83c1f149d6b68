//! Ordem Serviços API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use ordem_servicos_core::clock::SystemClock;
use ordem_servicos_store::MIGRATOR;
use ordem_servicos_store::pg_service_order_repository::PgServiceOrderRepository;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ordem_servicos_api::config::Config;
use ordem_servicos_api::error::AppError;
use ordem_servicos_api::routes;
use ordem_servicos_api::state::AppState;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // A missing .env file is not an error.
    let dotenv = dotenvy::dotenv();

    let config = Config::from_env();
    init_tracing(config.server.is_release());

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }
    tracing::info!(mode = %config.server.mode, "Starting Ordem Serviços API server");

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(config.database.connect_options()?)
        .await?;

    MIGRATOR.run(&pool).await?;
    tracing::info!("database migrations applied");

    // Build application state.
    let repository = Arc::new(PgServiceOrderRepository::new(pool));
    let app_state = AppState::new(Arc::new(SystemClock), repository);

    // Build router.
    // TODO: Replace CorsLayer::permissive() with the front-end origin once it is configurable.
    let app = Router::new()
        .nest("/api/v1", routes::health::router())
        .nest("/api/v1/os", routes::service_orders::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
