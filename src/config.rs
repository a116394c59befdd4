use std::path::{Path, PathBuf};

use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::db::deputy::seed_roster;
use crate::store::{MemoryStore, MongoStore, Storage};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    static_dir: Option<PathBuf>,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Directory holding a pre-built frontend, if one should be served.
    pub fn static_dir(&self) -> Option<&Path> {
        self.static_dir.as_deref()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Serve the frontend alongside the API if configured.
        if let Some(dir) = config.static_dir() {
            info!("Serving static files from {}", dir.display());
            rocket = rocket.mount("/", rocket::fs::FileServer::from(dir));
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// MongoDB; requires a replica set for transactions.
    Mongodb,
    /// Process-local memory; everything is lost on shutdown.
    Memory,
}

/// Configuration for the storage backend.
#[derive(Deserialize)]
struct StorageConfig {
    // non-secrets
    storage: Backend,
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: Option<String>,
}

fn default_db_name() -> String {
    "deputy_votes".to_string()
}

/// A fairing that loads the storage config, connects to the chosen backend,
/// seeds the deputy roster, and places the resulting [`Storage`] into managed
/// state.
pub struct StorageFairing;

#[rocket::async_trait]
impl Fairing for StorageFairing {
    fn info(&self) -> Info {
        Info {
            name: "Storage",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StorageConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load storage config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let storage = match config.storage {
            Backend::Memory => {
                warn!("Using in-memory storage; votes will not survive a restart");
                Storage::new(MemoryStore::new())
            }
            Backend::Mongodb => {
                let Some(db_uri) = config.db_uri else {
                    error!("`db_uri` must be set when `storage` is \"mongodb\"");
                    return Err(rocket);
                };
                info!("Loaded database config, connecting...");
                match MongoStore::connect(&db_uri, &config.db_name).await {
                    Ok(store) => Storage::new(store),
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };

        // Ensure the deputies exist.
        if let Err(e) = storage.seed_deputies(seed_roster()).await {
            error!("Failed to seed deputies: {e}");
            return Err(rocket);
        }
        info!("...storage online!");

        // Manage the state.
        rocket = rocket.manage(storage);
        Ok(rocket)
    }
}


#[cfg(test)]
mod tests {
    use rocket::figment::Figment;

    use super::*;

    #[test]
    fn storage_backend_names() {
        let config: StorageConfig = Figment::from(("storage", "memory")).extract().unwrap();
        assert_eq!(config.storage, Backend::Memory);
        assert_eq!(config.db_name, "deputy_votes");
        assert!(config.db_uri.is_none());

        let config: StorageConfig = Figment::from(("storage", "mongodb"))
            .merge(("db_uri", "mongodb://localhost:27017"))
            .extract()
            .unwrap();
        assert_eq!(config.storage, Backend::Mongodb);
    }

    #[test]
    fn auth_ttl_in_seconds() {
        assert_eq!(Config::example().auth_ttl(), Duration::hours(1));
    }
}
