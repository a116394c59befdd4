use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{DeputyId, UserVote},
};

/// A user's voting record, as returned to the client.
///
/// Anonymous callers get the zero value, with no IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVoteDescription {
    pub id: Option<ApiId>,
    pub user_id: Option<ApiId>,
    pub has_voted: bool,
    pub voted_deputies: Vec<DeputyId>,
}

impl From<UserVote> for UserVoteDescription {
    fn from(record: UserVote) -> Self {
        Self {
            id: Some(record.id.into()),
            user_id: Some(record.user_id.into()),
            has_voted: record.votes.has_voted,
            voted_deputies: record.votes.voted_deputies,
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{serde_json, serde_json::json};

    use crate::model::{db::UserVoteCore, mongodb::Id};

    use super::*;

    #[test]
    fn anonymous_record_is_zero_value() {
        let json = serde_json::to_value(UserVoteDescription::default()).unwrap();
        assert_eq!(
            json,
            json!({
                "id": null,
                "userId": null,
                "hasVoted": false,
                "votedDeputies": [],
            })
        );
    }

    #[test]
    fn record_fields_are_camel_case() {
        let user_id = Id::new();
        let record = UserVote {
            id: Id::new(),
            user_id,
            votes: UserVoteCore {
                has_voted: false,
                voted_deputies: vec!["4".to_string()],
            },
        };
        let json = serde_json::to_value(UserVoteDescription::from(record)).unwrap();
        assert_eq!(json["userId"], json!(user_id.to_string()));
        assert_eq!(json["votedDeputies"], json!(["4"]));
    }
}
