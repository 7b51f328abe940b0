//! Test accounts — in-memory `Accounts` implementation for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use streambot_core::accounts::Accounts;
use streambot_core::error::DomainError;
use streambot_core::user::{User, UserId};

/// An accounts store held in memory. Records every successful credit and can
/// be told to fail credits for specific users.
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    users: Mutex<BTreeMap<UserId, User>>,
    credits: Mutex<Vec<(UserId, u64)>>,
    failing_credits: BTreeSet<UserId>,
}

impl InMemoryAccounts {
    /// Create a store holding the given users.
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
            ..Self::default()
        }
    }

    /// Make every `credit` call for `user_id` fail with an infrastructure error.
    #[must_use]
    pub fn failing_credits_for(mut self, user_id: UserId) -> Self {
        self.failing_credits.insert(user_id);
        self
    }

    /// Returns every successful credit, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn credits(&self) -> Vec<(UserId, u64)> {
        self.credits.lock().unwrap().clone()
    }

    /// Returns a user's current balance.
    ///
    /// # Panics
    ///
    /// Panics if the user does not exist or the internal mutex is poisoned.
    pub fn balance(&self, user_id: UserId) -> u64 {
        self.users.lock().unwrap()[&user_id].balance
    }
}

#[async_trait]
impl Accounts for InMemoryAccounts {
    async fn get_user(&self, user_id: UserId) -> Result<User, DomainError> {
        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(DomainError::UserNotFound(user_id))
    }

    async fn credit(&self, user_id: UserId, amount: u64) -> Result<(), DomainError> {
        if self.failing_credits.contains(&user_id) {
            return Err(DomainError::Infrastructure("points ledger offline".into()));
        }
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&user_id)
            .ok_or(DomainError::UserNotFound(user_id))?;
        user.balance = user.balance.saturating_add(amount);
        self.credits.lock().unwrap().push((user_id, amount));
        Ok(())
    }

    async fn withdraw(&self, user_id: UserId, amount: u64) -> Result<(), DomainError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&user_id)
            .ok_or(DomainError::UserNotFound(user_id))?;
        if user.balance < amount {
            return Err(DomainError::InsufficientBalance {
                user_id,
                requested: amount,
                available: user.balance,
            });
        }
        user.balance -= amount;
        Ok(())
    }
}
