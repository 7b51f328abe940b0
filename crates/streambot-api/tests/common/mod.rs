//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use streambot_adventure::application::catalog::StaticStoryCatalog;
use streambot_adventure::application::orchestrator::{AdventureOrchestrator, Collaborators};
use streambot_adventure::application::settings::LiveSettings;
use streambot_adventure::domain::story::{Chapter, Story};
use streambot_core::accounts::Accounts;
use streambot_core::clock::Clock;
use streambot_core::settings::{Multiplier, RoundSettings};
use streambot_store::pg_accounts::PgAccounts;
use streambot_store::pg_round_history::PgRoundHistory;
use streambot_test_support::{FixedClock, RecordingMessenger, SequenceRng};
use tower::ServiceExt;

use streambot_api::routes;
use streambot_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Settings with a short join window and a 2x payout.
pub fn test_settings() -> RoundSettings {
    RoundSettings {
        join_timeout: Duration::from_millis(200),
        win_multiplier: Multiplier::from_hundredths(200),
        cooldown: Duration::from_secs(60),
    }
}

/// Insert a user with a starting balance.
pub async fn insert_user(pool: &PgPool, id: i64, name: &str, points: i64) {
    sqlx::query("INSERT INTO users (id, display_name, points) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(points)
        .execute(pool)
        .await
        .unwrap();
}

/// Everything a test needs to drive and inspect the app.
pub struct TestApp {
    pub router: Router,
    pub orchestrator: AdventureOrchestrator,
    pub messenger: Arc<RecordingMessenger>,
    pub history: PgRoundHistory,
}

/// Build the full app router backed by the real `PostgreSQL` stores, a
/// recording messenger and a deterministic RNG. Uses the same route structure
/// as `main.rs`.
pub fn build_test_app(pool: PgPool, rng: SequenceRng) -> TestApp {
    let accounts: Arc<dyn Accounts> = Arc::new(PgAccounts::new(pool.clone()));
    let history = PgRoundHistory::new(pool);
    let messenger = Arc::new(RecordingMessenger::new());
    let settings = Arc::new(LiveSettings::new(test_settings()).unwrap());
    let catalog = StaticStoryCatalog::new(
        vec![Story {
            title: "The Goblin Market".into(),
            chapters: vec![
                Chapter::new("The market opens at dusk."),
                Chapter::new("{{survivors}} haggled their way out."),
                Chapter::new("{{victims}} were sold for spare parts."),
            ],
        }],
        Duration::from_millis(100),
    )
    .unwrap();

    let orchestrator = AdventureOrchestrator::new(Collaborators {
        catalog: Arc::new(catalog),
        settings: settings.clone(),
        messenger: messenger.clone(),
        accounts: accounts.clone(),
        history: Arc::new(history.clone()),
        clock: fixed_clock(),
        rng: Box::new(rng),
    });
    let app_state = AppState::new(orchestrator.clone(), accounts, settings);

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/adventure", routes::adventure::router())
        .with_state(app_state);

    TestApp {
        router,
        orchestrator,
        messenger,
        history,
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a request with a JSON body and return the response.
pub async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}
