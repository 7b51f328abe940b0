//! Round timeline: the delayed steps of one round and the task that runs them.
//!
//! Each round gets its own worker task and cancellation token. The worker
//! waits out the join window, asks the orchestrator to start the round, then
//! walks the resulting timeline in order. Offsets are measured from the
//! moment the round started, so one slow step does not push later steps back.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::domain::errors::AdventureError;

/// A step scheduled on a round's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineAction {
    /// Narrate the chapter at this zero-based index.
    Chapter(usize),
    /// Settle payouts and reset the game.
    Settle,
}

/// A step and its offset from round start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    /// Delay after round start.
    pub offset: Duration,
    /// What to do.
    pub action: TimelineAction,
}

/// Ordered steps of a running round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// Chapter `k` (1-based) fires at `k × interval`; settlement fires one
    /// interval after the last chapter.
    #[must_use]
    pub fn for_chapters(chapter_count: usize, interval: Duration) -> Self {
        let at = |k: usize| interval.saturating_mul(u32::try_from(k).unwrap_or(u32::MAX));
        let mut entries: Vec<TimelineEntry> = (1..=chapter_count)
            .map(|k| TimelineEntry {
                offset: at(k),
                action: TimelineAction::Chapter(k - 1),
            })
            .collect();
        entries.push(TimelineEntry {
            offset: at(chapter_count + 1),
            action: TimelineAction::Settle,
        });
        Self { entries }
    }

    /// Entries in firing order.
    #[must_use]
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }
}

/// What a step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A chapter was posted.
    Posted,
    /// A chapter was left out because it names an empty team.
    Skipped,
    /// Payouts were settled and the game reset.
    Settled,
    /// The step belongs to a round that no longer exists; nothing happened.
    Stale,
}

/// The round operations the worker drives.
#[async_trait]
pub trait RoundSteps: Send + Sync {
    /// Closes the join window. Returns `None` if the round is gone.
    async fn start_round(&self, round_id: Uuid) -> Result<Option<Timeline>, AdventureError>;

    /// Runs one timeline step.
    async fn run_step(
        &self,
        round_id: Uuid,
        action: TimelineAction,
    ) -> Result<StepOutcome, AdventureError>;

    /// Tears the round down without settling.
    fn abort_round(&self, round_id: Uuid);
}

/// Handle to the worker of one round.
#[derive(Debug)]
pub struct RoundScheduler {
    token: CancellationToken,
}

impl RoundScheduler {
    /// Spawns the worker for `round_id`. Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(steps: Arc<dyn RoundSteps>, round_id: Uuid, join_timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let worker = drive(steps, round_id, join_timeout, token.clone());
        tokio::spawn(worker.instrument(info_span!("adventure_round", %round_id)));
        Self { token }
    }

    /// Stops every remaining step of the round.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the round has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Sleeps until `deadline`. Returns `false` if cancelled first.
async fn wait(token: &CancellationToken, deadline: Instant) -> bool {
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        () = sleep_until(deadline) => true,
    }
}

async fn drive(
    steps: Arc<dyn RoundSteps>,
    round_id: Uuid,
    join_timeout: Duration,
    token: CancellationToken,
) {
    if !wait(&token, Instant::now() + join_timeout).await {
        debug!("round cancelled during join window");
        return;
    }

    let start = {
        let steps = Arc::clone(&steps);
        tokio::spawn(async move { steps.start_round(round_id).await }.in_current_span())
    };
    let timeline = match start.await {
        Ok(Ok(Some(timeline))) => timeline,
        Ok(Ok(None)) => return,
        Ok(Err(e)) => {
            error!(error = %e, "failed to start round");
            steps.abort_round(round_id);
            return;
        }
        Err(e) => {
            error!(error = %e, "round start panicked");
            steps.abort_round(round_id);
            return;
        }
    };

    let started = Instant::now();
    for entry in timeline.entries() {
        if !wait(&token, started + entry.offset).await {
            debug!(action = ?entry.action, "round cancelled before step");
            return;
        }
        let action = entry.action;
        let step = {
            let steps = Arc::clone(&steps);
            tokio::spawn(async move { steps.run_step(round_id, action).await }.in_current_span())
        };
        match step.await {
            Ok(Ok(outcome)) => debug!(?action, ?outcome, "round step finished"),
            Ok(Err(e)) => warn!(?action, error = %e, "round step failed"),
            Err(e) => {
                error!(?action, error = %e, "round step panicked");
                // Settling is the only way out of `Running`.
                if action == TimelineAction::Settle {
                    steps.abort_round(round_id);
                }
            }
        }
    }
}
