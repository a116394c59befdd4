use serde::{Deserialize, Serialize};

use crate::model::db::{Deputy, DeputyId};

/// An API-friendly deputy with its current vote total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeputyDescription {
    pub id: DeputyId,
    pub name: String,
    pub faction: String,
    pub votes: u32,
}

impl From<Deputy> for DeputyDescription {
    fn from(deputy: Deputy) -> Self {
        Self {
            id: deputy.id,
            name: deputy.name,
            faction: deputy.faction,
            votes: deputy.votes,
        }
    }
}
