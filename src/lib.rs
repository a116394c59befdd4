#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod store;

pub use config::Config;

use config::{ConfigFairing, StorageFairing};
use events::VoteEvents;
use logging::LoggerFairing;

/// Build the server, connecting to whichever storage backend is configured.
pub fn build() -> Rocket<Build> {
    with_routes(rocket::build().attach(StorageFairing))
}

/// Everything except storage.
fn with_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .register("/", api::catchers())
        .manage(VoteEvents::new())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
}

/// Build a server around the given store, with fixed test secrets.
#[cfg(test)]
pub(crate) fn rocket_for_store(store: store::Storage) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", "test secret"))
        .merge(("auth_ttl", 3600))
        .merge(("log_level", "off"));
    with_routes(rocket::custom(figment).manage(store))
}
