use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    /// Lowercased email address.
    pub username: String,
    pub password_hash: String,
}

impl UserCore {
    /// Check whether the given password is correct.
    ///
    /// `argon2::verify_encoded` compares hashes in constant time.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// Spend as long on a password as [`UserCore::verify_password`] would, for a username
/// that does not exist. Always fails.
pub fn verify_password_of_missing_user<T: AsRef<[u8]>>(password: T) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    let dummy_hash = DUMMY_HASH.get_or_init(|| {
        argon2::hash_encoded(b"no such user", &[0x5a; 16], &argon2::Config::default()).ok()
    });
    if let Some(hash) = dummy_hash {
        let _ = argon2::verify_encoded(hash, password.as_ref());
    }
    false
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}
