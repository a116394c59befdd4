use rocket::{serde::json::Json, Catcher, Request, Route};

use crate::error::ErrorBody;

pub mod auth;
pub mod deputies;
pub mod events;
pub mod votes;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(deputies::routes());
    routes.extend(votes::routes());
    routes.extend(events::routes());
    routes
}

/// JSON error bodies for requests that never reach a handler's own error path.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        not_found,
        unprocessable,
        internal_error
    ]
}

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new("Invalid request"))
}

#[catch(401)]
fn unauthorized() -> Json<ErrorBody> {
    Json(ErrorBody::new("Not logged in"))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new(format!("Nothing found at {}", req.uri())))
}

#[catch(422)]
fn unprocessable() -> Json<ErrorBody> {
    Json(ErrorBody::new("Malformed request body"))
}

#[catch(500)]
fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody::new("Internal server error"))
}
