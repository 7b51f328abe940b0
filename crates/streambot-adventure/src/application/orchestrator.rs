//! The adventure orchestrator: owns the lifecycle, the roster and the story
//! of the current round.
//!
//! All state lives behind one mutex. Chat joins and the round worker both go
//! through it, and no lock is held across an `.await`: steps copy what they
//! need, release the lock, then talk to collaborators.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use streambot_core::accounts::Accounts;
use streambot_core::clock::Clock;
use streambot_core::history::{OutcomeStatus, RoundHistory, RoundOutcome};
use streambot_core::messenger::Messenger;
use streambot_core::rng::DeterministicRng;
use streambot_core::settings::{RoundSettings, SettingsSource};
use streambot_core::user::{UserId, UserRef};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::catalog::StoryCatalog;
use crate::application::timeline::{
    RoundScheduler, RoundSteps, StepOutcome, Timeline, TimelineAction,
};
use crate::domain::entrant::{Entrant, Identity, Team};
use crate::domain::errors::AdventureError;
use crate::domain::ledger::{Payout, compute_settlement};
use crate::domain::roster::Roster;
use crate::domain::state::{AdventureState, RoundEvent};
use crate::domain::story::Story;

/// Everything the orchestrator talks to.
pub struct Collaborators {
    /// Source of stories.
    pub catalog: Arc<dyn StoryCatalog>,
    /// Source of round settings.
    pub settings: Arc<dyn SettingsSource>,
    /// Chat output.
    pub messenger: Arc<dyn Messenger>,
    /// Point balances.
    pub accounts: Arc<dyn Accounts>,
    /// Outcome history.
    pub history: Arc<dyn RoundHistory>,
    /// Wall clock for informational timestamps.
    pub clock: Arc<dyn Clock>,
    /// Randomness for story picks and team draws.
    pub rng: Box<dyn DeterministicRng>,
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinReceipt {
    /// The round joined.
    pub round_id: Uuid,
    /// Whether this join opened the round.
    pub opened_round: bool,
    /// Entrants in the round after this join.
    pub entrant_count: usize,
    /// Whether a companion stake was added.
    pub companion_admitted: bool,
}

/// Read-only view of the game for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdventureSnapshot {
    /// Current lifecycle state.
    pub state: AdventureState,
    /// Suggested time for the next round.
    pub next_run: DateTime<Utc>,
    /// Current round, if any.
    pub round_id: Option<Uuid>,
    /// Title of the current story, if any.
    pub story_title: Option<String>,
    /// Entrants in the current round.
    pub entrant_count: usize,
}

struct ActiveRound {
    id: Uuid,
    story: Story,
    chapter_interval: Duration,
    settings: RoundSettings,
    roster: Roster,
    settling: bool,
    scheduler: RoundScheduler,
}

struct RoundSlot {
    state: AdventureState,
    round: Option<ActiveRound>,
    next_run: DateTime<Utc>,
}

impl RoundSlot {
    /// The round `round_id` if it is still current and not cancelled.
    fn live_round(&self, round_id: Uuid) -> Option<&ActiveRound> {
        self.round
            .as_ref()
            .filter(|r| r.id == round_id && !r.scheduler.is_cancelled())
    }
}

struct Shared {
    catalog: Arc<dyn StoryCatalog>,
    settings: Arc<dyn SettingsSource>,
    messenger: Arc<dyn Messenger>,
    accounts: Arc<dyn Accounts>,
    history: Arc<dyn RoundHistory>,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn DeterministicRng>>,
    slot: Mutex<RoundSlot>,
}

/// Runs the adventure game. Cheap to clone; clones share one game.
#[derive(Clone)]
pub struct AdventureOrchestrator {
    shared: Arc<Shared>,
}

impl AdventureOrchestrator {
    /// Creates an idle orchestrator.
    #[must_use]
    pub fn new(collaborators: Collaborators) -> Self {
        let next_run = collaborators.clock.now();
        Self {
            shared: Arc::new(Shared {
                catalog: collaborators.catalog,
                settings: collaborators.settings,
                messenger: collaborators.messenger,
                accounts: collaborators.accounts,
                history: collaborators.history,
                clock: collaborators.clock,
                rng: Mutex::new(collaborators.rng),
                slot: Mutex::new(RoundSlot {
                    state: AdventureState::Idle,
                    round: None,
                    next_run,
                }),
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, RoundSlot> {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn rng(&self) -> MutexGuard<'_, Box<dyn DeterministicRng>> {
        self.shared
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AdventureState {
        self.slot().state
    }

    /// Suggested start of the next round (last reset plus cooldown).
    #[must_use]
    pub fn next_run(&self) -> DateTime<Utc> {
        self.slot().next_run
    }

    /// Whether `user_id` holds a personal entry in the current round.
    #[must_use]
    pub fn has_joined(&self, user_id: UserId) -> bool {
        self.slot()
            .round
            .as_ref()
            .is_some_and(|r| r.roster.has_user(user_id))
    }

    /// Display view of the game.
    #[must_use]
    pub fn snapshot(&self) -> AdventureSnapshot {
        let slot = self.slot();
        let round = slot.round.as_ref();
        AdventureSnapshot {
            state: slot.state,
            next_run: slot.next_run,
            round_id: round.map(|r| r.id),
            story_title: round.map(|r| r.story.title.clone()),
            entrant_count: round.map_or(0, |r| r.roster.len()),
        }
    }

    /// Adds a stake for `user`, plus a half-size stake for their companion if
    /// one is named. The first join of an idle period opens a round and arms
    /// the join window. The bet must already be withdrawn from the user.
    ///
    /// # Errors
    ///
    /// - `AdventureError::InvalidBet` if `bet` is zero.
    /// - `AdventureError::RoundInProgress` once the round is running.
    /// - `AdventureError::AlreadyJoined` if the user already has an entry.
    /// - `AdventureError::Domain` with a configuration error if a round cannot
    ///   be opened; the game stays idle.
    pub fn join(
        &self,
        user: UserRef,
        companion: Option<&str>,
        bet: u64,
    ) -> Result<JoinReceipt, AdventureError> {
        if bet == 0 {
            return Err(AdventureError::InvalidBet);
        }

        let mut slot = self.slot();
        let mut rng = self.rng();

        let opened_round = match slot.state {
            AdventureState::Running => return Err(AdventureError::RoundInProgress),
            AdventureState::JoinOpen => false,
            AdventureState::Idle => {
                let settings = self.shared.settings.current_round_settings()?;
                settings.validate()?;
                let story = self.shared.catalog.random_story(&mut **rng)?;
                let next = slot.state.transition(RoundEvent::FirstJoin)?;

                let round_id = Uuid::now_v7();
                let scheduler =
                    RoundScheduler::spawn(Arc::new(self.clone()), round_id, settings.join_timeout);
                info!(
                    %round_id,
                    title = %story.title,
                    join_timeout_ms = settings.join_timeout.as_millis(),
                    "adventure opened for joins"
                );
                slot.round = Some(ActiveRound {
                    id: round_id,
                    story,
                    chapter_interval: self.shared.catalog.chapter_interval(),
                    settings,
                    roster: Roster::new(),
                    settling: false,
                    scheduler,
                });
                slot.state = next;
                true
            }
        };

        let Some(round) = slot.round.as_mut() else {
            return Err(AdventureError::IllegalTransition {
                from: AdventureState::Idle,
                event: RoundEvent::FirstJoin,
            });
        };
        if round.roster.has_user(user.id) {
            return Err(AdventureError::AlreadyJoined(user.id));
        }

        // Later joins pick up the multiplier live, but never past this point.
        let multiplier = self
            .shared
            .settings
            .current_round_settings()
            .ok()
            .filter(|s| s.validate().is_ok())
            .map_or(round.settings.win_multiplier, |s| s.win_multiplier);

        let companion_stake = bet / 2;
        let companion = companion
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter(|_| companion_stake > 0 && !round.roster.has_companion_of(user.id))
            .map(str::to_owned);

        round.roster.admit(Entrant {
            identity: Identity::User(user.clone()),
            bet,
            multiplier,
            team: Team::draw(&mut **rng),
        });
        let companion_admitted = companion.is_some();
        if let Some(name) = companion {
            round.roster.admit(Entrant {
                identity: Identity::Companion {
                    name,
                    owner: user.clone(),
                },
                bet: companion_stake,
                multiplier,
                team: Team::draw(&mut **rng),
            });
        }

        debug!(
            round_id = %round.id,
            user_id = %user.id,
            bet,
            companion_admitted,
            "adventurer joined"
        );

        Ok(JoinReceipt {
            round_id: round.id,
            opened_round,
            entrant_count: round.roster.len(),
            companion_admitted,
        })
    }

    /// Closes the join window: moves to `Running`, announces the story and
    /// returns the timeline of chapters and settlement.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::IllegalTransition` if the round is not
    /// accepting joins.
    pub async fn start_round(&self, round_id: Uuid) -> Result<Option<Timeline>, AdventureError> {
        let (announcement, timeline) = {
            let mut slot = self.slot();
            let Some(round) = slot.live_round(round_id) else {
                return Ok(None);
            };
            let next = slot.state.transition(RoundEvent::JoinWindowClosed)?;
            let count = round.roster.len();
            let announcement = format!(
                "The adventure \"{}\" begins with {count} {}!",
                round.story.title,
                if count == 1 { "adventurer" } else { "adventurers" }
            );
            let timeline = Timeline::for_chapters(round.story.chapters.len(), round.chapter_interval);
            info!(%round_id, entrants = count, "adventure started");
            slot.state = next;
            (announcement, timeline)
        };

        if let Err(e) = self.shared.messenger.post(&announcement).await {
            warn!(%round_id, error = %e, "failed to post adventure announcement");
        }
        Ok(Some(timeline))
    }

    /// Narrates chapter `index`. Chapters naming an empty team are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::Render` if the template is malformed, or a
    /// domain error if posting fails. Either way only this chapter is lost.
    pub async fn advance_narrative(
        &self,
        round_id: Uuid,
        index: usize,
    ) -> Result<StepOutcome, AdventureError> {
        let (chapter, survivors, victims) = {
            let slot = self.slot();
            let Some(round) = slot
                .live_round(round_id)
                .filter(|_| slot.state == AdventureState::Running)
            else {
                return Ok(StepOutcome::Stale);
            };
            let Some(chapter) = round.story.chapters.get(index) else {
                return Ok(StepOutcome::Stale);
            };
            (
                chapter.clone(),
                round.roster.survivor_names(),
                round.roster.victim_names(),
            )
        };

        if chapter.should_skip(&survivors, &victims) {
            debug!(%round_id, index, "chapter skipped, it names an empty team");
            return Ok(StepOutcome::Skipped);
        }

        let text = chapter.render(&survivors, &victims)?;
        self.shared.messenger.post(&text).await?;
        Ok(StepOutcome::Posted)
    }

    /// Pays the survivors, records every stake and resets the game. Runs at
    /// most once per round.
    ///
    /// # Errors
    ///
    /// Never fails as a whole: individual credit, post and history failures
    /// are logged and settlement carries on.
    pub async fn settle(&self, round_id: Uuid) -> Result<StepOutcome, AdventureError> {
        let roster = {
            let mut slot = self.slot();
            let running = slot.state == AdventureState::Running;
            let Some(round) = slot
                .round
                .as_mut()
                .filter(|r| running && r.id == round_id && !r.scheduler.is_cancelled() && !r.settling)
            else {
                return Ok(StepOutcome::Stale);
            };
            round.settling = true;
            round.roster.clone()
        };

        let settlement = compute_settlement(&roster);

        let mut credited: Vec<&Payout> = Vec::with_capacity(settlement.payouts.len());
        let mut failed = HashSet::new();
        for payout in &settlement.payouts {
            match self
                .shared
                .accounts
                .credit(payout.user.id, payout.amount)
                .await
            {
                Ok(()) => credited.push(payout),
                Err(e) => {
                    error!(
                        %round_id,
                        user_id = %payout.user.id,
                        amount = payout.amount,
                        error = %e,
                        "failed to credit adventure payout"
                    );
                    failed.insert(payout.user.id);
                }
            }
        }

        if !credited.is_empty() {
            let list = credited
                .iter()
                .map(|p| format!("{}: {}", p.user.display_name, p.amount))
                .collect::<Vec<_>>()
                .join(", ");
            if let Err(e) = self
                .shared
                .messenger
                .post(&format!("The adventure is over! Payouts: {list}"))
                .await
            {
                warn!(%round_id, error = %e, "failed to post adventure payouts");
            }
        }

        let recorded_at = self.shared.clock.now();
        for result in &settlement.results {
            let (payout, status) = match result.team {
                Team::Victims => (0, OutcomeStatus::Lost),
                Team::Survivors if failed.contains(&result.owner.id) => {
                    (0, OutcomeStatus::CreditFailed)
                }
                Team::Survivors => (result.payout, OutcomeStatus::Won),
            };
            let outcome = RoundOutcome {
                round_id,
                user_id: result.owner.id,
                bet: result.bet,
                payout,
                companion: result.companion,
                status,
                recorded_at,
            };
            if let Err(e) = self.shared.history.record_outcome(&outcome).await {
                warn!(
                    %round_id,
                    user_id = %outcome.user_id,
                    error = %e,
                    "failed to record adventure outcome"
                );
            }
        }

        let total = credited
            .iter()
            .fold(0u64, |sum, p| sum.saturating_add(p.amount));
        info!(
            %round_id,
            winners = credited.len(),
            failed_credits = failed.len(),
            total_owed = settlement.total_credited(),
            total_credited = total,
            "adventure settled"
        );

        self.reset_round(round_id, RoundEvent::Settled);
        Ok(StepOutcome::Settled)
    }

    /// Cancels any active round without settling and returns to `Idle`.
    /// Stakes of the cancelled round are not refunded. No-op when idle.
    pub fn shutdown(&self) {
        let round_id = self.slot().round.as_ref().map(|r| r.id);
        if let Some(round_id) = round_id {
            warn!(%round_id, "adventure cancelled before settlement");
            self.reset_round(round_id, RoundEvent::Aborted);
        }
    }

    /// Cancels the round's remaining steps, clears it and goes `Idle`.
    /// Returns `false` if `round_id` is not the current round.
    fn reset_round(&self, round_id: Uuid, event: RoundEvent) -> bool {
        let mut slot = self.slot();
        if !slot.round.as_ref().is_some_and(|r| r.id == round_id) {
            return false;
        }
        let next = match slot.state.transition(event) {
            Ok(next) => next,
            Err(e) => {
                warn!(%round_id, error = %e, "refusing to reset adventure");
                return false;
            }
        };
        let Some(round) = slot.round.take() else {
            return false;
        };
        round.scheduler.cancel();

        slot.next_run = self.shared.clock.after(round.settings.cooldown);
        slot.state = next;
        debug!(%round_id, next_run = %slot.next_run, "adventure reset");
        true
    }
}

#[async_trait]
impl RoundSteps for AdventureOrchestrator {
    async fn start_round(&self, round_id: Uuid) -> Result<Option<Timeline>, AdventureError> {
        AdventureOrchestrator::start_round(self, round_id).await
    }

    async fn run_step(
        &self,
        round_id: Uuid,
        action: TimelineAction,
    ) -> Result<StepOutcome, AdventureError> {
        match action {
            TimelineAction::Chapter(index) => self.advance_narrative(round_id, index).await,
            TimelineAction::Settle => self.settle(round_id).await,
        }
    }

    fn abort_round(&self, round_id: Uuid) {
        self.reset_round(round_id, RoundEvent::Aborted);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use streambot_core::error::DomainError;
    use streambot_core::rng::StdRandom;
    use streambot_core::settings::Multiplier;
    use streambot_core::user::User;
    use streambot_test_support::{
        FailingMessenger, FailingRoundHistory, FixedClock, InMemoryAccounts, MissingSettings, MockRng,
        RecordingMessenger, RecordingRoundHistory, SequenceRng, StaticSettings,
    };

    use super::*;
    use crate::application::catalog::StaticStoryCatalog;
    use crate::application::settings::LiveSettings;
    use crate::domain::story::Chapter;

    const CHAPTERS: [&str; 3] = [
        "The party enters the mine.",
        "{{survivors}} found the exit.",
        "{{victims}} were lost in the dark.",
    ];

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn settings(multiplier: u32) -> RoundSettings {
        RoundSettings {
            join_timeout: ms(1000),
            win_multiplier: Multiplier::from_hundredths(multiplier),
            cooldown: Duration::from_secs(60),
        }
    }

    fn user(id: i64, name: &str) -> UserRef {
        UserRef {
            id: UserId(id),
            display_name: name.to_owned(),
        }
    }

    fn accounts() -> InMemoryAccounts {
        InMemoryAccounts::with_users([(1, "alice"), (2, "bob"), (3, "carol")].map(
            |(id, name)| User {
                id: UserId(id),
                display_name: name.to_owned(),
                balance: 1000,
            },
        ))
    }

    fn catalog(chapters: &[&str]) -> Arc<dyn StoryCatalog> {
        let story = Story {
            title: "The Haunted Mine".to_owned(),
            chapters: chapters.iter().map(|c| Chapter::new(*c)).collect(),
        };
        Arc::new(StaticStoryCatalog::new(vec![story], ms(500)).unwrap())
    }

    struct Harness {
        orchestrator: AdventureOrchestrator,
        messenger: Arc<RecordingMessenger>,
        accounts: Arc<InMemoryAccounts>,
        history: Arc<RecordingRoundHistory>,
    }

    impl Harness {
        fn build(
            chapters: &[&str],
            settings: Arc<dyn SettingsSource>,
            accounts: InMemoryAccounts,
            rng: Box<dyn DeterministicRng>,
        ) -> Self {
            let messenger = Arc::new(RecordingMessenger::new());
            let accounts = Arc::new(accounts);
            let history = Arc::new(RecordingRoundHistory::new());
            let orchestrator = AdventureOrchestrator::new(Collaborators {
                catalog: catalog(chapters),
                settings,
                messenger: messenger.clone(),
                accounts: accounts.clone(),
                history: history.clone(),
                clock: Arc::new(FixedClock(fixed_now())),
                rng,
            });
            Self {
                orchestrator,
                messenger,
                accounts,
                history,
            }
        }

        /// Story pick first, then one coin per stake (1 = survivor).
        fn with_rng(values: Vec<u32>) -> Self {
            Self::build(
                &CHAPTERS,
                Arc::new(StaticSettings(settings(200))),
                accounts(),
                Box::new(SequenceRng::new(values)),
            )
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_user_round_narrates_in_order_and_pays_survivor() {
        // Arrange
        let h = Harness::with_rng(vec![0, 1, 0]);

        // Act
        let first = h.orchestrator.join(user(1, "alice"), None, 100).unwrap();
        let second = h.orchestrator.join(user(2, "bob"), None, 200).unwrap();

        // Assert
        assert!(first.opened_round);
        assert!(!second.opened_round);
        assert_eq!(second.round_id, first.round_id);
        assert_eq!(second.entrant_count, 2);
        assert_eq!(h.orchestrator.state(), AdventureState::JoinOpen);

        tokio::time::sleep(ms(999)).await;
        assert_eq!(h.orchestrator.state(), AdventureState::JoinOpen);
        assert!(h.messenger.posted().is_empty());

        tokio::time::sleep(ms(2)).await;
        assert_eq!(h.orchestrator.state(), AdventureState::Running);
        assert_eq!(
            h.messenger.posted(),
            vec!["The adventure \"The Haunted Mine\" begins with 2 adventurers!"]
        );

        tokio::time::sleep(ms(500)).await;
        assert_eq!(h.messenger.posted().len(), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(
            h.messenger.posted(),
            vec![
                "The adventure \"The Haunted Mine\" begins with 2 adventurers!",
                "The party enters the mine.",
                "alice found the exit.",
                "bob were lost in the dark.",
                "The adventure is over! Payouts: alice: 200",
            ]
        );
        assert_eq!(h.accounts.credits(), vec![(UserId(1), 200)]);
        assert_eq!(h.accounts.balance(UserId(1)), 1200);

        let outcomes = h.history.outcomes();
        assert_eq!(outcomes.len(), 2);
        let alice = outcomes.iter().find(|o| o.user_id == UserId(1)).unwrap();
        assert_eq!((alice.bet, alice.payout, alice.status), (100, 200, OutcomeStatus::Won));
        let bob = outcomes.iter().find(|o| o.user_id == UserId(2)).unwrap();
        assert_eq!((bob.bet, bob.payout, bob.status), (200, 0, OutcomeStatus::Lost));
        assert!(outcomes.iter().all(|o| o.round_id == first.round_id));

        let snapshot = h.orchestrator.snapshot();
        assert_eq!(snapshot.state, AdventureState::Idle);
        assert_eq!(snapshot.entrant_count, 0);
        assert_eq!(snapshot.round_id, None);
        assert_eq!(
            h.orchestrator.next_run(),
            fixed_now() + TimeDelta::seconds(60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_chapters_naming_empty_team_are_skipped() {
        // Arrange: every coin lands on victims.
        let h = Harness::build(
            &CHAPTERS,
            Arc::new(StaticSettings(settings(200))),
            accounts(),
            Box::new(MockRng),
        );

        // Act
        h.orchestrator.join(user(1, "alice"), None, 100).unwrap();
        h.orchestrator.join(user(2, "bob"), None, 50).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(
            h.messenger.posted(),
            vec![
                "The adventure \"The Haunted Mine\" begins with 2 adventurers!",
                "The party enters the mine.",
                "alice, bob were lost in the dark.",
            ]
        );
        assert!(h.accounts.credits().is_empty());
        let outcomes = h.history.outcomes();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::Lost && o.payout == 0));
        assert_eq!(h.orchestrator.state(), AdventureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_companion_stake_is_half_bet_and_credited_with_owner() {
        // Arrange
        let h = Harness::with_rng(vec![0, 1, 1]);

        // Act
        let receipt = h
            .orchestrator
            .join(user(1, "alice"), Some("Pip"), 100)
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert!(receipt.companion_admitted);
        assert_eq!(receipt.entrant_count, 2);
        assert_eq!(h.accounts.credits(), vec![(UserId(1), 300)]);
        assert!(h.messenger.posted().contains(&"alice, Pip found the exit.".to_owned()));
        assert_eq!(
            h.messenger.posted().last().unwrap(),
            "The adventure is over! Payouts: alice: 300"
        );

        let mut outcomes: Vec<_> = h
            .history
            .outcomes()
            .into_iter()
            .map(|o| (o.user_id, o.bet, o.payout, o.companion))
            .collect();
        outcomes.sort_by_key(|o| o.1);
        assert_eq!(
            outcomes,
            vec![(UserId(1), 50, 100, true), (UserId(1), 100, 200, false)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_companion_ignored_when_stake_would_be_zero() {
        let h = Harness::with_rng(vec![0, 1]);

        let receipt = h.orchestrator.join(user(1, "alice"), Some("Pip"), 1).unwrap();

        assert!(!receipt.companion_admitted);
        assert_eq!(receipt.entrant_count, 1);
        h.orchestrator.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_rejected_once_round_is_running() {
        // Arrange
        let h = Harness::with_rng(vec![0, 1]);
        h.orchestrator.join(user(1, "alice"), None, 100).unwrap();
        tokio::time::sleep(ms(1001)).await;

        // Act
        let result = h.orchestrator.join(user(2, "bob"), None, 100);

        // Assert
        assert!(matches!(result, Err(AdventureError::RoundInProgress)));
        assert_eq!(h.orchestrator.snapshot().entrant_count, 1);
        assert!(!h.orchestrator.has_joined(UserId(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_join_rejected() {
        // Arrange
        let h = Harness::with_rng(vec![0, 1]);
        h.orchestrator.join(user(1, "alice"), None, 100).unwrap();

        // Act
        let result = h.orchestrator.join(user(1, "alice"), None, 100);

        // Assert
        match result {
            Err(AdventureError::AlreadyJoined(id)) => assert_eq!(id, UserId(1)),
            other => panic!("expected AlreadyJoined, got {other:?}"),
        }
        assert!(h.orchestrator.has_joined(UserId(1)));
        assert_eq!(h.orchestrator.snapshot().entrant_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_bet_rejected_without_opening_round() {
        let h = Harness::with_rng(vec![]);

        let result = h.orchestrator.join(user(1, "alice"), None, 0);

        assert!(matches!(result, Err(AdventureError::InvalidBet)));
        assert_eq!(h.orchestrator.state(), AdventureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configuration_error_keeps_game_idle() {
        // Arrange
        let h = Harness::build(
            &CHAPTERS,
            Arc::new(MissingSettings),
            accounts(),
            Box::new(MockRng),
        );

        // Act
        let result = h.orchestrator.join(user(1, "alice"), None, 100);
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert!(matches!(
            result,
            Err(AdventureError::Domain(DomainError::Configuration(_)))
        ));
        assert_eq!(h.orchestrator.state(), AdventureState::Idle);
        assert!(h.messenger.posted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_of_reset_round_have_no_effect() {
        // Arrange
        let h = Harness::with_rng(vec![0, 1, 0]);
        let receipt = h.orchestrator.join(user(1, "alice"), None, 100).unwrap();
        h.orchestrator.join(user(2, "bob"), None, 200).unwrap();
        tokio::time::sleep(ms(1001)).await;
        assert_eq!(h.orchestrator.state(), AdventureState::Running);

        // Act
        h.orchestrator.shutdown();
        let chapter = h
            .orchestrator
            .advance_narrative(receipt.round_id, 1)
            .await
            .unwrap();
        let settle = h.orchestrator.settle(receipt.round_id).await.unwrap();
        let restart = h.orchestrator.start_round(receipt.round_id).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(chapter, StepOutcome::Stale);
        assert_eq!(settle, StepOutcome::Stale);
        assert!(restart.is_none());
        assert_eq!(h.orchestrator.state(), AdventureState::Idle);
        assert_eq!(h.orchestrator.snapshot().entrant_count, 0);
        assert_eq!(h.messenger.posted().len(), 1);
        assert!(h.accounts.credits().is_empty());
        assert!(h.history.outcomes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_when_idle_is_noop() {
        let h = Harness::with_rng(vec![]);
        let before = h.orchestrator.next_run();

        h.orchestrator.shutdown();

        assert_eq!(h.orchestrator.state(), AdventureState::Idle);
        assert_eq!(h.orchestrator.next_run(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_credit_does_not_block_other_winners() {
        // Arrange
        let h = Harness::build(
            &CHAPTERS,
            Arc::new(StaticSettings(settings(200))),
            accounts().failing_credits_for(UserId(1)),
            Box::new(SequenceRng::new(vec![0, 1, 1])),
        );

        // Act
        h.orchestrator.join(user(1, "alice"), None, 100).unwrap();
        h.orchestrator.join(user(2, "bob"), None, 200).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(h.accounts.credits(), vec![(UserId(2), 400)]);
        assert_eq!(
            h.messenger.posted().last().unwrap(),
            "The adventure is over! Payouts: bob: 400"
        );
        let outcomes = h.history.outcomes();
        let alice = outcomes.iter().find(|o| o.user_id == UserId(1)).unwrap();
        assert_eq!(alice.status, OutcomeStatus::CreditFailed);
        assert_eq!(alice.payout, 0);
        let bob = outcomes.iter().find(|o| o.user_id == UserId(2)).unwrap();
        assert_eq!(bob.status, OutcomeStatus::Won);
        assert_eq!(h.orchestrator.state(), AdventureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_chapter_does_not_stop_the_round() {
        // Arrange
        let h = Harness::build(
            &["{{dragon}} stirs.", "{{survivors}} found the exit."],
            Arc::new(StaticSettings(settings(200))),
            accounts(),
            Box::new(SequenceRng::new(vec![0, 1])),
        );

        // Act
        h.orchestrator.join(user(1, "alice"), None, 100).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(
            h.messenger.posted(),
            vec![
                "The adventure \"The Haunted Mine\" begins with 1 adventurer!",
                "alice found the exit.",
                "The adventure is over! Payouts: alice: 200",
            ]
        );
        assert_eq!(h.orchestrator.state(), AdventureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_chat_still_settles() {
        // Arrange
        let accounts = Arc::new(accounts());
        let history = Arc::new(RecordingRoundHistory::new());
        let orchestrator = AdventureOrchestrator::new(Collaborators {
            catalog: catalog(&CHAPTERS),
            settings: Arc::new(StaticSettings(settings(200))),
            messenger: Arc::new(FailingMessenger),
            accounts: accounts.clone(),
            history: history.clone(),
            clock: Arc::new(FixedClock(fixed_now())),
            rng: Box::new(SequenceRng::new(vec![0, 1])),
        });

        // Act
        orchestrator.join(user(1, "alice"), None, 100).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(accounts.credits(), vec![(UserId(1), 200)]);
        assert_eq!(history.outcomes().len(), 1);
        assert_eq!(orchestrator.state(), AdventureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_failure_still_credits_and_resets() {
        // Arrange
        let messenger = Arc::new(RecordingMessenger::new());
        let accounts = Arc::new(accounts());
        let orchestrator = AdventureOrchestrator::new(Collaborators {
            catalog: catalog(&CHAPTERS),
            settings: Arc::new(StaticSettings(settings(200))),
            messenger: messenger.clone(),
            accounts: accounts.clone(),
            history: Arc::new(FailingRoundHistory),
            clock: Arc::new(FixedClock(fixed_now())),
            rng: Box::new(SequenceRng::new(vec![0, 1, 1])),
        });

        // Act
        orchestrator.join(user(1, "alice"), None, 100).unwrap();
        orchestrator.join(user(3, "carol"), None, 10).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(accounts.credits(), vec![(UserId(1), 200), (UserId(3), 20)]);
        assert_eq!(
            messenger.posted().last().unwrap(),
            "The adventure is over! Payouts: alice: 200, carol: 20"
        );
        assert_eq!(orchestrator.state(), AdventureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiplier_is_captured_at_join_time() {
        // Arrange
        let live = Arc::new(LiveSettings::new(settings(200)).unwrap());
        let h = Harness::build(
            &CHAPTERS,
            live.clone(),
            accounts(),
            Box::new(SequenceRng::new(vec![0, 1, 1])),
        );

        // Act
        h.orchestrator.join(user(1, "alice"), None, 100).unwrap();
        live.update(settings(300)).unwrap();
        h.orchestrator.join(user(2, "bob"), None, 100).unwrap();
        tokio::time::sleep(ms(1001)).await;
        live.update(settings(1000)).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(
            h.accounts.credits(),
            vec![(UserId(1), 200), (UserId(2), 300)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_round_can_open_right_after_settlement() {
        // Arrange
        let h = Harness::with_rng(vec![0, 1, 0, 0]);
        let first = h.orchestrator.join(user(1, "alice"), None, 100).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.orchestrator.state(), AdventureState::Idle);

        // Act
        let second = h.orchestrator.join(user(2, "bob"), None, 100).unwrap();

        // Assert
        assert!(second.opened_round);
        assert_ne!(second.round_id, first.round_id);
        assert_eq!(h.orchestrator.state(), AdventureState::JoinOpen);
        assert!(!h.orchestrator.has_joined(UserId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_entrant_lands_on_exactly_one_team() {
        // Arrange
        let h = Harness::build(
            &CHAPTERS,
            Arc::new(StaticSettings(settings(200))),
            accounts(),
            Box::new(StdRandom::seeded(99)),
        );

        // Act
        let mut companions = 0;
        for id in 1..=20 {
            let companion = (id % 2 == 0).then(|| format!("pet-{id}"));
            let receipt = h
                .orchestrator
                .join(user(id, &format!("user-{id}")), companion.as_deref(), 10)
                .unwrap();
            companions += usize::from(receipt.companion_admitted);
        }

        // Assert
        let roster = h.orchestrator.slot().round.as_ref().unwrap().roster.clone();
        let survivors = roster.survivor_names();
        let victims = roster.victim_names();
        assert_eq!(companions, 10);
        assert_eq!(roster.len(), 30);
        assert_eq!(survivors.len() + victims.len(), 30);
        assert!(survivors.iter().all(|name| !victims.contains(name)));
        h.orchestrator.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_survivor_with_floored_payout_is_recorded_as_won() {
        // Arrange: half multiplier floors a bet of 1 to nothing.
        let h = Harness::build(
            &CHAPTERS,
            Arc::new(StaticSettings(settings(50))),
            accounts(),
            Box::new(SequenceRng::new(vec![0, 1])),
        );

        // Act
        h.orchestrator.join(user(1, "alice"), None, 1).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        let outcomes = h.history.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            (outcomes[0].user_id, outcomes[0].payout, outcomes[0].status),
            (UserId(1), 0, OutcomeStatus::Won)
        );
        assert!(h.accounts.credits().is_empty());
        assert_eq!(h.orchestrator.state(), AdventureState::Idle);
    }

    /// Posts like a recording messenger but panics on one exact line.
    struct PanickingMessenger {
        inner: RecordingMessenger,
        trigger: &'static str,
    }

    #[async_trait]
    impl Messenger for PanickingMessenger {
        async fn post(&self, text: &str) -> Result<(), DomainError> {
            assert_ne!(text, self.trigger, "chat client crashed");
            self.inner.post(text).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_chapter_post_still_settles_round() {
        // Arrange
        let messenger = Arc::new(PanickingMessenger {
            inner: RecordingMessenger::new(),
            trigger: "boom",
        });
        let accounts = Arc::new(accounts());
        let history = Arc::new(RecordingRoundHistory::new());
        let orchestrator = AdventureOrchestrator::new(Collaborators {
            catalog: catalog(&["boom", "calm"]),
            settings: Arc::new(StaticSettings(settings(200))),
            messenger: messenger.clone(),
            accounts: accounts.clone(),
            history: history.clone(),
            clock: Arc::new(FixedClock(fixed_now())),
            rng: Box::new(SequenceRng::new(vec![0, 1, 0, 1])),
        });

        // Act
        orchestrator.join(user(1, "alice"), None, 100).unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        // Assert
        assert_eq!(orchestrator.state(), AdventureState::Idle);
        let posted = messenger.inner.posted();
        assert!(!posted.iter().any(|line| line == "boom"));
        assert!(posted.iter().any(|line| line == "calm"));
        assert_eq!(accounts.credits(), vec![(UserId(1), 200)]);
        let outcomes = history.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, OutcomeStatus::Won);

        let next = orchestrator.join(user(2, "bob"), None, 50).unwrap();
        assert!(next.opened_round);
        orchestrator.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_joins_racing_window_expiry_keep_roster_consistent() {
        // Arrange
        let h = Harness::build(
            &CHAPTERS,
            Arc::new(StaticSettings(RoundSettings {
                join_timeout: ms(50),
                win_multiplier: Multiplier::from_hundredths(200),
                cooldown: Duration::from_secs(60),
            })),
            accounts(),
            Box::new(StdRandom::seeded(7)),
        );

        // Act
        let mut tasks = Vec::new();
        for id in 1..=64_i64 {
            let orchestrator = h.orchestrator.clone();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(ms(id.unsigned_abs())).await;
                let companion = (id % 2 == 0).then(|| format!("pet-{id}"));
                let result =
                    orchestrator.join(user(id, &format!("user-{id}")), companion.as_deref(), 10);
                (id, result)
            }));
        }
        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }
        tokio::time::sleep(ms(200)).await;

        // Assert
        assert_eq!(h.orchestrator.state(), AdventureState::Running);
        let late = h.orchestrator.join(user(99, "late"), None, 10);
        assert!(matches!(late, Err(AdventureError::RoundInProgress)));

        let mut admitted_stakes = 0;
        for (id, result) in &results {
            match result {
                Ok(receipt) => {
                    admitted_stakes += 1 + usize::from(receipt.companion_admitted);
                    assert!(h.orchestrator.has_joined(UserId(*id)));
                }
                Err(e) => {
                    assert!(matches!(e, AdventureError::RoundInProgress), "{e}");
                    assert!(!h.orchestrator.has_joined(UserId(*id)));
                }
            }
        }
        assert!(admitted_stakes > 0);
        assert!(!h.orchestrator.has_joined(UserId(99)));

        let roster = h.orchestrator.slot().round.as_ref().unwrap().roster.clone();
        let survivors = roster.survivor_names();
        let victims = roster.victim_names();
        assert_eq!(roster.len(), admitted_stakes);
        assert_eq!(survivors.len() + victims.len(), roster.len());
        assert!(survivors.iter().all(|name| !victims.contains(name)));
        h.orchestrator.shutdown();
    }
}
