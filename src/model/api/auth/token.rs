use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{api::id::ApiId, db::User, mongodb::Id};
use crate::store::Storage;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific logged-in user.
/// This is the user's session: it lives in a signed cookie and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(rename = "sub")]
    id: ApiId,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given user.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id.into(),
        }
    }

    /// The ID of the user this token belongs to.
    pub fn id(&self) -> Id {
        self.id.into()
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Every rejected session looks the same to the client.
fn not_logged_in() -> Error {
    Error::unauthorized("Not logged in")
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and check the user it names still exists.
    ///
    /// Fails with `401 Unauthorized` when there is no valid session. Routes that also serve
    /// anonymous callers take a `Result<AuthToken, Error>` and check for that status.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => return Outcome::Failure((Status::Unauthorized, not_logged_in())),
        };

        // Decode the token.
        let token = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => {
                debug!("Rejecting auth token: {e}");
                return Outcome::Failure((Status::Unauthorized, not_logged_in()));
            }
        };

        // Check the user actually exists.
        let store = try_outcome!(req.guard::<Storage>().await);
        match store.user(token.id()).await {
            Ok(Some(_)) => Outcome::Success(token),
            Ok(None) => {
                debug!("Rejecting auth token for missing user {}", token.id);
                Outcome::Failure((Status::Unauthorized, not_logged_in()))
            }
            Err(e) => Outcome::Failure((Status::InternalServerError, e)),
        }
    }
}
