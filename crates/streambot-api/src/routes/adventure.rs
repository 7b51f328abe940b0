//! Routes for the adventure game: status, joining and live settings.

use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use streambot_adventure::application::orchestrator::{AdventureSnapshot, JoinReceipt};
use streambot_adventure::domain::errors::AdventureError;
use streambot_adventure::domain::state::AdventureState;
use streambot_core::error::DomainError;
use streambot_core::settings::{Multiplier, RoundSettings, SettingsSource};
use streambot_core::user::{UserId, UserRef};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /join.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// The chat user joining.
    pub user_id: i64,
    /// Points wagered.
    pub bet: u64,
    /// Optional companion name; it adds a stake of half the bet.
    #[serde(default)]
    pub companion: Option<String>,
}

/// Response body for a successful join.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    /// The round joined.
    pub round_id: Uuid,
    /// Whether this join opened the round.
    pub opened_round: bool,
    /// Entrants in the round after this join.
    pub entrant_count: usize,
    /// Whether the companion was admitted.
    pub companion_admitted: bool,
    /// The user's balance after the bet was taken.
    pub balance: u64,
}

/// Response body for GET /.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Current lifecycle state.
    pub state: AdventureState,
    /// Suggested start of the next round.
    pub next_run: DateTime<Utc>,
    /// Current round, if any.
    pub round_id: Option<Uuid>,
    /// Current story title, if any.
    pub story_title: Option<String>,
    /// Entrants in the current round.
    pub entrant_count: usize,
}

impl From<AdventureSnapshot> for StatusResponse {
    fn from(s: AdventureSnapshot) -> Self {
        Self {
            state: s.state,
            next_run: s.next_run,
            round_id: s.round_id,
            story_title: s.story_title,
            entrant_count: s.entrant_count,
        }
    }
}

/// Adventure settings as exchanged over HTTP.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SettingsBody {
    /// Length of the join window in milliseconds.
    pub join_timeout_ms: u64,
    /// Payout ratio for survivors, e.g. `1.5`.
    pub win_multiplier: f64,
    /// Suggested pause between rounds in milliseconds.
    pub cooldown_ms: u64,
}

impl From<RoundSettings> for SettingsBody {
    fn from(s: RoundSettings) -> Self {
        Self {
            join_timeout_ms: u64::try_from(s.join_timeout.as_millis()).unwrap_or(u64::MAX),
            win_multiplier: s.win_multiplier.as_ratio(),
            cooldown_ms: u64::try_from(s.cooldown.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl TryFrom<SettingsBody> for RoundSettings {
    type Error = ApiError;

    fn try_from(body: SettingsBody) -> Result<Self, Self::Error> {
        if body.join_timeout_ms == 0 {
            return Err(DomainError::Validation("join_timeout_ms must be positive".into()).into());
        }
        Ok(Self {
            join_timeout: Duration::from_millis(body.join_timeout_ms),
            win_multiplier: Multiplier::from_ratio(body.win_multiplier)?,
            cooldown: Duration::from_millis(body.cooldown_ms),
        })
    }
}

/// GET /
async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.orchestrator.snapshot().into())
}

/// POST /join
///
/// Takes the bet from the user's balance, then enters them. A rejected entry
/// gives the bet back.
#[instrument(skip(state, request), fields(user_id = request.user_id, bet = request.bet))]
async fn join(
    State(state): State<AppState>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let user_id = UserId(request.user_id);
    if request.bet == 0 {
        return Err(AdventureError::InvalidBet.into());
    }
    if state.orchestrator.state() == AdventureState::Running {
        return Err(AdventureError::RoundInProgress.into());
    }
    if state.orchestrator.has_joined(user_id) {
        return Err(AdventureError::AlreadyJoined(user_id).into());
    }

    let user = state.accounts.get_user(user_id).await?;
    state.accounts.withdraw(user_id, request.bet).await?;

    let receipt: JoinReceipt = match state.orchestrator.join(
        UserRef::from(&user),
        request.companion.as_deref(),
        request.bet,
    ) {
        Ok(receipt) => receipt,
        Err(e) => {
            if let Err(refund) = state.accounts.credit(user_id, request.bet).await {
                error!(%user_id, bet = request.bet, error = %refund, "failed to refund rejected bet");
            }
            return Err(e.into());
        }
    };

    info!(round_id = %receipt.round_id, opened = receipt.opened_round, "user joined adventure");

    Ok(Json(JoinResponse {
        round_id: receipt.round_id,
        opened_round: receipt.opened_round,
        entrant_count: receipt.entrant_count,
        companion_admitted: receipt.companion_admitted,
        balance: user.balance.saturating_sub(request.bet),
    }))
}

/// GET /settings
async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsBody>, ApiError> {
    let current = state.settings.current_round_settings()?;
    Ok(Json(current.into()))
}

/// PUT /settings
#[instrument(skip(state, body))]
async fn put_settings(
    State(state): State<AppState>,
    Json(body): Json<SettingsBody>,
) -> Result<Json<SettingsBody>, ApiError> {
    let settings = RoundSettings::try_from(body)?;
    state.settings.update(settings)?;
    info!(
        join_timeout_ms = body.join_timeout_ms,
        win_multiplier = %settings.win_multiplier,
        cooldown_ms = body.cooldown_ms,
        "adventure settings replaced"
    );
    Ok(Json(settings.into()))
}

/// Returns the router for the adventure game.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_status))
        .route("/join", post(join))
        .route("/settings", get(get_settings).put(put_settings))
}
