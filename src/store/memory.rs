use std::collections::HashMap;

use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    db::{
        deputy::seed_roster, Deputy, DeputyId, NewUser, NewUserVote, User, UserVote,
        VoteRejection,
    },
    mongodb::Id,
};

use super::{CastVote, VoteStore};

#[derive(Default)]
struct Tables {
    users: HashMap<Id, User>,
    deputies: HashMap<DeputyId, Deputy>,
    /// Keyed by user ID.
    user_votes: HashMap<Id, UserVote>,
}

impl Tables {
    fn leaderboard(&self) -> Vec<Deputy> {
        let mut deputies = self.deputies.values().cloned().collect::<Vec<_>>();
        deputies.sort_by(Deputy::leaderboard_order);
        deputies
    }

    fn user_votes(&mut self, user_id: Id) -> &mut UserVote {
        self.user_votes.entry(user_id).or_insert_with(|| {
            let NewUserVote { user_id, votes } = NewUserVote::empty(user_id);
            UserVote {
                id: Id::new(),
                user_id,
                votes,
            }
        })
    }
}

/// A process-local store. Everything is lost on shutdown.
///
/// A single lock guards all tables, so each operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the standard deputy roster.
    pub fn seeded() -> Self {
        let deputies = seed_roster()
            .into_iter()
            .map(|deputy| (deputy.id.clone(), deputy))
            .collect();
        Self {
            tables: Mutex::new(Tables {
                deputies,
                ..Tables::default()
            }),
        }
    }
}

#[rocket::async_trait]
impl VoteStore for MemoryStore {
    async fn seed_deputies(&self, deputies: Vec<Deputy>) -> Result<()> {
        let mut tables = self.tables.lock().await;
        for deputy in deputies {
            tables.deputies.entry(deputy.id.clone()).or_insert(deputy);
        }
        Ok(())
    }

    async fn user(&self, id: Id) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(Error::bad_request("Username already exists"));
        }
        let user = User { id: Id::new(), user };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn deputies(&self) -> Result<Vec<Deputy>> {
        Ok(self.tables.lock().await.leaderboard())
    }

    async fn user_votes(&self, user_id: Id) -> Result<UserVote> {
        Ok(self.tables.lock().await.user_votes(user_id).clone())
    }

    async fn cast_vote(&self, user_id: Id, deputy_id: &str) -> Result<CastVote> {
        let mut tables = self.tables.lock().await;
        tables.user_votes(user_id).check(deputy_id)?;

        let deputy = tables
            .deputies
            .get_mut(deputy_id)
            .ok_or_else(|| VoteRejection::DeputyNotFound(deputy_id.to_string()))?;
        deputy.votes += 1;

        let record = tables.user_votes(user_id);
        record.record(deputy_id.to_string());
        let record = record.clone();

        Ok(CastVote {
            record,
            leaderboard: Some(tables.leaderboard()),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::store::{contract, Storage};

    use super::*;

    fn store() -> Storage {
        Storage::new(MemoryStore::seeded())
    }

    #[rocket::async_test]
    async fn duplicate_usernames_rejected() {
        contract::duplicate_usernames_rejected(store()).await;
    }

    #[rocket::async_test]
    async fn seeding_is_idempotent() {
        contract::seeding_is_idempotent(store()).await;
    }

    #[rocket::async_test]
    async fn vote_limits_enforced() {
        contract::vote_limits_enforced(store()).await;
    }

    #[rocket::async_test]
    async fn rejections_leave_no_trace() {
        contract::rejections_leave_no_trace(store()).await;
    }

    #[rocket::async_test]
    async fn concurrent_votes_serialised() {
        contract::concurrent_votes_serialised(store()).await;
    }

    #[rocket::async_test]
    async fn tallies_match_records() {
        contract::tallies_match_records(store()).await;
    }

    #[rocket::async_test]
    async fn empty_store_has_no_deputies() {
        let store = MemoryStore::new();
        assert!(store.deputies().await.unwrap().is_empty());
        let err = store.cast_vote(Id::new(), "1").await.unwrap_err();
        assert!(matches!(err, Error::Vote(VoteRejection::DeputyNotFound(_))));
    }
}
