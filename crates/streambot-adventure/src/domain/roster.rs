//! The roster of one round, split by team.

use streambot_core::user::UserId;

use super::entrant::{Entrant, Team};

/// Entrants of the current round. Append-only while joins are open; each
/// entrant lives on exactly one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    survivors: Vec<Entrant>,
    victims: Vec<Entrant>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entrant to the side named by its team.
    pub fn admit(&mut self, entrant: Entrant) {
        match entrant.team {
            Team::Survivors => self.survivors.push(entrant),
            Team::Victims => self.victims.push(entrant),
        }
    }

    /// Entrants drawn as survivors.
    #[must_use]
    pub fn survivors(&self) -> &[Entrant] {
        &self.survivors
    }

    /// Entrants drawn as victims.
    #[must_use]
    pub fn victims(&self) -> &[Entrant] {
        &self.victims
    }

    /// All entrants, survivors first.
    pub fn entrants(&self) -> impl Iterator<Item = &Entrant> {
        self.survivors.iter().chain(self.victims.iter())
    }

    /// Total number of entrants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.survivors.len() + self.victims.len()
    }

    /// Whether nobody has joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.survivors.is_empty() && self.victims.is_empty()
    }

    /// Whether `user_id` holds a personal (non-companion) entry.
    #[must_use]
    pub fn has_user(&self, user_id: UserId) -> bool {
        self.entrants()
            .any(|e| !e.identity.is_companion() && e.identity.owner().id == user_id)
    }

    /// Whether `user_id` already has a companion entry.
    #[must_use]
    pub fn has_companion_of(&self, user_id: UserId) -> bool {
        self.entrants()
            .any(|e| e.identity.is_companion() && e.identity.owner().id == user_id)
    }

    /// Narration names of the survivors, in join order.
    #[must_use]
    pub fn survivor_names(&self) -> Vec<String> {
        self.survivors
            .iter()
            .map(|e| e.identity.name().to_owned())
            .collect()
    }

    /// Narration names of the victims, in join order.
    #[must_use]
    pub fn victim_names(&self) -> Vec<String> {
        self.victims
            .iter()
            .map(|e| e.identity.name().to_owned())
            .collect()
    }
}
