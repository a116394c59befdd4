use serde::{Deserialize, Serialize};

use crate::model::api::deputy::DeputyDescription;

/// A message pushed to every live subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteEvent {
    /// A vote was cast; carries the refreshed leaderboard.
    VoteUpdate { deputies: Vec<DeputyDescription> },
}

impl VoteEvent {
    /// Votes cast across all deputies at the time of the event.
    pub fn total_votes(&self) -> u64 {
        match self {
            Self::VoteUpdate { deputies } => deputies.iter().map(|d| u64::from(d.votes)).sum(),
        }
    }
}
