mod credentials;
mod token;

pub use credentials::Credentials;
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
