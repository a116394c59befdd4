use rocket::{serde::json::Json, Route};

use crate::{error::Result, model::api::deputy::DeputyDescription, store::Storage};

pub fn routes() -> Vec<Route> {
    routes![deputies]
}

/// The leaderboard: every deputy, most votes first.
#[get("/api/deputies")]
pub async fn deputies(store: Storage) -> Result<Json<Vec<DeputyDescription>>> {
    let deputies = store
        .deputies()
        .await?
        .into_iter()
        .map(DeputyDescription::from)
        .collect();
    Ok(Json(deputies))
}
