use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{db::deputy::DeputyId, mongodb::Id};

/// How many distinct deputies a single user may vote for.
pub const MAX_VOTES: usize = 5;

/// Reasons a vote is refused, in the order they are checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteRejection {
    #[error("All votes used: you have already voted for 5 deputies")]
    AllVotesUsed,
    #[error("Already voted for this deputy")]
    AlreadyVoted,
    #[error("Deputy '{0}' not found")]
    DeputyNotFound(DeputyId),
}

/// Core per-user voting record, as stored in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVoteCore {
    /// Set once the user has used every vote.
    pub has_voted: bool,
    /// Deputies voted for, in the order the votes were cast.
    pub voted_deputies: Vec<DeputyId>,
}

impl UserVoteCore {
    /// Check whether a vote for `deputy_id` is allowed, ignoring whether the deputy exists.
    pub fn check(&self, deputy_id: &str) -> Result<(), VoteRejection> {
        if self.voted_deputies.len() >= MAX_VOTES {
            return Err(VoteRejection::AllVotesUsed);
        }
        if self.voted_deputies.iter().any(|id| id == deputy_id) {
            return Err(VoteRejection::AlreadyVoted);
        }
        Ok(())
    }

    /// Record a vote that has already passed [`Self::check`].
    pub fn record(&mut self, deputy_id: DeputyId) {
        self.voted_deputies.push(deputy_id);
        self.has_voted = self.voted_deputies.len() >= MAX_VOTES;
    }

    /// Votes the user still has available.
    pub fn remaining(&self) -> usize {
        MAX_VOTES.saturating_sub(self.voted_deputies.len())
    }
}

/// A voting record without an ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserVote {
    pub user_id: Id,
    pub votes: UserVoteCore,
}

impl NewUserVote {
    /// A fresh record for a user that has not voted yet.
    pub fn empty(user_id: Id) -> Self {
        Self {
            user_id,
            votes: UserVoteCore::default(),
        }
    }
}

/// A voting record from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVote {
    #[serde(rename = "_id")]
    pub id: Id,
    pub user_id: Id,
    #[serde(flatten)]
    pub votes: UserVoteCore,
}

impl Deref for UserVote {
    type Target = UserVoteCore;

    fn deref(&self) -> &Self::Target {
        &self.votes
    }
}

impl DerefMut for UserVote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.votes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voted_for(ids: &[&str]) -> UserVoteCore {
        let mut votes = UserVoteCore::default();
        for id in ids {
            votes.record(id.to_string());
        }
        votes
    }

    #[test]
    fn fresh_record_accepts_any_deputy() {
        let votes = UserVoteCore::default();
        assert_eq!(votes.check("1"), Ok(()));
        assert_eq!(votes.remaining(), MAX_VOTES);
        assert!(!votes.has_voted);
    }

    #[test]
    fn duplicate_vote_is_rejected() {
        let votes = voted_for(&["3"]);
        assert_eq!(votes.check("3"), Err(VoteRejection::AlreadyVoted));
        assert_eq!(votes.check("4"), Ok(()));
    }

    #[test]
    fn has_voted_set_on_last_vote() {
        let mut votes = voted_for(&["1", "2", "3", "4"]);
        assert!(!votes.has_voted);
        votes.record("5".to_string());
        assert!(votes.has_voted);
        assert_eq!(votes.remaining(), 0);
    }

    #[test]
    fn exhausted_budget_checked_before_duplicates() {
        let votes = voted_for(&["1", "2", "3", "4", "5"]);
        assert_eq!(votes.check("6"), Err(VoteRejection::AllVotesUsed));
        assert_eq!(votes.check("1"), Err(VoteRejection::AllVotesUsed));
    }
}
