//! Data access.
//!
//! Every route talks to storage through [`VoteStore`], so the backing database is chosen
//! once at ignition and injected as managed state.

use std::ops::Deref;
use std::sync::Arc;

use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
    State,
};

use crate::error::{Error, Result};
use crate::model::{
    db::{Deputy, NewUser, User, UserVote},
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Storage operations needed by the voting service.
///
/// Implementations must make [`VoteStore::cast_vote`] atomic per user: the vote limit and
/// the no-duplicates rule hold under concurrent calls, and the deputy's counter moves
/// together with the user's record.
#[rocket::async_trait]
pub trait VoteStore: Send + Sync {
    /// Insert any of the given deputies that do not exist yet. Existing totals are kept.
    async fn seed_deputies(&self, deputies: Vec<Deputy>) -> Result<()>;

    /// Look up a user by ID.
    async fn user(&self, id: Id) -> Result<Option<User>>;

    /// Look up a user by their (already normalised) username.
    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Create a user, failing with `400 Bad Request` if the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// All deputies, most votes first.
    async fn deputies(&self) -> Result<Vec<Deputy>>;

    /// The user's voting record, created empty if it does not exist yet.
    async fn user_votes(&self, user_id: Id) -> Result<UserVote>;

    /// Cast the user's vote for the given deputy, returning the updated record and the
    /// leaderboard as it stood right after the vote.
    async fn cast_vote(&self, user_id: Id, deputy_id: &str) -> Result<CastVote>;
}

/// A vote that went through.
#[derive(Debug, Clone)]
pub struct CastVote {
    pub record: UserVote,
    /// All deputies, most votes first. `None` if the vote was stored but the leaderboard
    /// could not be read afterwards.
    pub leaderboard: Option<Vec<Deputy>>,
}

/// Handle on the configured [`VoteStore`], available as managed state and as a request guard.
#[derive(Clone)]
pub struct Storage(Arc<dyn VoteStore>);

impl Storage {
    pub fn new(store: impl VoteStore + 'static) -> Self {
        Self(Arc::new(store))
    }
}

impl Deref for Storage {
    type Target = dyn VoteStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Storage {
    type Error = Error;

    /// Get the store from the managed state.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<&State<Storage>>().await {
            request::Outcome::Success(storage) => request::Outcome::Success(storage.inner().clone()),
            _ => request::Outcome::Failure((
                Status::InternalServerError,
                Error::Status(
                    Status::InternalServerError,
                    "Storage is not configured".to_string(),
                ),
            )),
        }
    }
}
