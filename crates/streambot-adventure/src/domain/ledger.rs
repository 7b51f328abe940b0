//! Payout accounting for a finished round.

use std::collections::HashMap;

use streambot_core::user::UserRef;

use super::entrant::Team;
use super::roster::Roster;

/// Points owed to one user, summed over all of their surviving stakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    /// The user to credit.
    pub user: UserRef,
    /// Total points to credit.
    pub amount: u64,
}

/// The result of one stake, for the round history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeResult {
    /// The user the stake belongs to.
    pub owner: UserRef,
    /// Points wagered.
    pub bet: u64,
    /// Points owed for this stake.
    pub payout: u64,
    /// Whether the stake was placed by a companion.
    pub companion: bool,
    /// The side the stake landed on.
    pub team: Team,
}

/// Payouts and per-stake results for a finalized roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    /// One entry per winning user, in order of their first surviving stake.
    pub payouts: Vec<Payout>,
    /// One entry per stake, survivors first.
    pub results: Vec<StakeResult>,
}

impl Settlement {
    /// Sum of all payouts.
    #[must_use]
    pub fn total_credited(&self) -> u64 {
        self.payouts
            .iter()
            .fold(0u64, |sum, p| sum.saturating_add(p.amount))
    }
}

/// Computes payouts for a finalized roster.
///
/// Survivor stakes pay `bet × multiplier` to their owner (companions pay
/// their owner); victims pay nothing. Payouts are aggregated per user so each
/// user is credited once.
#[must_use]
pub fn compute_settlement(roster: &Roster) -> Settlement {
    let mut settlement = Settlement::default();
    let mut index_by_user = HashMap::new();

    for entrant in roster.entrants() {
        let owner = entrant.identity.owner();
        let payout = entrant.payout();

        if payout > 0 {
            let index = *index_by_user.entry(owner.id).or_insert_with(|| {
                settlement.payouts.push(Payout {
                    user: owner.clone(),
                    amount: 0,
                });
                settlement.payouts.len() - 1
            });
            let entry = &mut settlement.payouts[index];
            entry.amount = entry.amount.saturating_add(payout);
        }

        settlement.results.push(StakeResult {
            owner: owner.clone(),
            bet: entrant.bet,
            payout,
            companion: entrant.identity.is_companion(),
            team: entrant.team,
        });
    }

    settlement
}
