use std::sync::OnceLock;

use argon2::Config;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::db::NewUser;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Raw user credentials, received from a client. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// The username as it is stored: trimmed and lowercased, so lookups are case-insensitive.
    pub fn normalized_username(&self) -> String {
        self.username.trim().to_lowercase()
    }

    /// Check the credentials are acceptable for a new account.
    pub fn validate(&self) -> Result<()> {
        static EMAIL: OnceLock<Regex> = OnceLock::new();
        let email = EMAIL.get_or_init(|| {
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
        });

        if !email.is_match(&self.normalized_username()) {
            return Err(Error::bad_request(
                "Username must be a valid email address",
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::bad_request(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }
        Ok(())
    }
}

impl TryFrom<Credentials> for NewUser {
    type Error = Error;

    /// Convert [`Credentials`] to a new [`NewUser`] by hashing the password.
    /// This enforces an email-shaped username and the minimum password length.
    fn try_from(cred: Credentials) -> Result<Self> {
        cred.validate()?;

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash = argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            username: cred.normalized_username(),
            password_hash,
        })
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl Credentials {
        pub fn example() -> Self {
            Self {
                username: "anna.berzina@example.lv".into(),
                password: "balsot2024".into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "Janis@Example.lv".into(),
                password: "saeima-100".into(),
            }
        }
    }
}
