//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs are serialised in MongoDB's own format.
//! - Field names are snake_case.

pub mod deputy;
pub mod user;
pub mod user_vote;

pub use deputy::{Deputy, DeputyId};
pub use user::{NewUser, User};
pub use user_vote::{NewUserVote, UserVote, UserVoteCore, VoteRejection, MAX_VOTES};
