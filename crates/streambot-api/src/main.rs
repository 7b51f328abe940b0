//! Streambot API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use streambot_adventure::application::catalog::StaticStoryCatalog;
use streambot_adventure::application::orchestrator::{AdventureOrchestrator, Collaborators};
use streambot_adventure::application::settings::LiveSettings;
use streambot_api::config::AppConfig;
use streambot_api::error::AppError;
use streambot_api::messenger::LogMessenger;
use streambot_api::routes;
use streambot_api::state::AppState;
use streambot_core::accounts::Accounts;
use streambot_core::clock::SystemClock;
use streambot_core::rng::StdRandom;
use streambot_store::pg_accounts::PgAccounts;
use streambot_store::pg_round_history::PgRoundHistory;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Streambot API server");

    let config = AppConfig::from_env()?;

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let catalog = StaticStoryCatalog::from_yaml_file(&config.stories_path)?;
    tracing::info!(
        stories = catalog.len(),
        path = %config.stories_path.display(),
        "story catalog loaded"
    );

    let settings = Arc::new(LiveSettings::new(config.round_settings)?);
    let mut changes = settings.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let current = *changes.borrow_and_update();
            tracing::info!(
                join_timeout_ms = current.join_timeout.as_millis(),
                win_multiplier = %current.win_multiplier,
                cooldown_ms = current.cooldown.as_millis(),
                "adventure settings reloaded, next round picks them up"
            );
        }
    });

    let accounts: Arc<dyn Accounts> = Arc::new(PgAccounts::new(pool.clone()));
    let orchestrator = AdventureOrchestrator::new(Collaborators {
        catalog: Arc::new(catalog),
        settings: settings.clone(),
        messenger: Arc::new(LogMessenger),
        accounts: accounts.clone(),
        history: Arc::new(PgRoundHistory::new(pool)),
        clock: Arc::new(SystemClock),
        rng: Box::new(StdRandom::from_os()),
    });

    let app_state = AppState::new(orchestrator.clone(), accounts, settings);

    // Build router.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/adventure", routes::adventure::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // An unfinished round cannot survive the process.
    orchestrator.shutdown();
    tracing::info!("Streambot API server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
