use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::User};

/// The public view of a user. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescription {
    pub id: ApiId,
    pub username: String,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            username: user.user.username,
        }
    }
}
