use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    events::VoteEvents,
    model::api::{
        auth::AuthToken, deputy::DeputyDescription, event::VoteEvent,
        user_vote::UserVoteDescription,
    },
    store::{CastVote, Storage},
};

pub fn routes() -> Vec<Route> {
    routes![votes, cast_vote]
}

/// The caller's voting record. Anonymous callers get the zero value.
#[get("/api/votes")]
pub async fn votes(
    token: std::result::Result<AuthToken, Error>,
    store: Storage,
) -> Result<Json<UserVoteDescription>> {
    let token = match token {
        Ok(token) => token,
        Err(e) if e.status() == Status::Unauthorized => {
            return Ok(Json(UserVoteDescription::default()))
        }
        Err(e) => return Err(e),
    };

    let record = store.user_votes(token.id()).await?;
    Ok(Json(record.into()))
}

#[post("/api/vote/<deputy_id>")]
pub async fn cast_vote(
    token: AuthToken,
    deputy_id: &str,
    store: Storage,
    events: &State<VoteEvents>,
) -> Result<Json<UserVoteDescription>> {
    let CastVote {
        record,
        leaderboard,
    } = store.cast_vote(token.id(), deputy_id).await?;
    info!(
        "User {} voted for deputy {deputy_id} ({} left)",
        token.id(),
        record.remaining()
    );

    // The vote is already committed, so a missing broadcast is not the caller's problem.
    if let Some(deputies) = leaderboard {
        let deputies = deputies.into_iter().map(DeputyDescription::from).collect();
        match events.publish(VoteEvent::VoteUpdate { deputies }) {
            Some(listeners) => debug!("Vote update sent to {listeners} subscribers"),
            None => debug!("Vote update superseded by a newer one"),
        }
    }

    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use rocket::local::asynchronous::Client;

    use crate::error::ErrorBody;
    use crate::model::db::MAX_VOTES;

    use super::*;

    async fn vote(client: &Client, deputy_id: &str) -> (Status, Option<UserVoteDescription>) {
        let response = client.post(uri!(cast_vote(deputy_id))).dispatch().await;
        let status = response.status();
        let body = if status == Status::Ok {
            response.into_json().await
        } else {
            None
        };
        (status, body)
    }

    async fn rejection(client: &Client, deputy_id: &str) -> (Status, String) {
        let response = client.post(uri!(cast_vote(deputy_id))).dispatch().await;
        let status = response.status();
        let message = response.into_json::<ErrorBody>().await.unwrap().message;
        (status, message)
    }

    #[backend_test]
    async fn anonymous_votes_are_zero_value(client: Client) {
        let response = client.get(uri!(votes)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            response.into_json::<UserVoteDescription>().await.unwrap(),
            UserVoteDescription::default()
        );
    }

    #[backend_test(voter)]
    async fn first_query_creates_record(client: Client) {
        let record = client
            .get(uri!(votes))
            .dispatch()
            .await
            .into_json::<UserVoteDescription>()
            .await
            .unwrap();
        assert!(record.id.is_some());
        assert!(record.user_id.is_some());
        assert!(!record.has_voted);
        assert!(record.voted_deputies.is_empty());
    }

    #[backend_test]
    async fn anonymous_vote_rejected(client: Client, store: Storage) {
        let (status, message) = rejection(&client, "1").await;
        assert_eq!(Status::Unauthorized, status);
        assert_eq!(message, "Not logged in");

        let deputies = store.deputies().await.unwrap();
        assert!(deputies.iter().all(|deputy| deputy.votes == 0));
    }

    #[backend_test(voter)]
    async fn five_votes_then_refused(client: Client, store: Storage) {
        for (n, deputy) in ["1", "2", "3", "4", "5"].into_iter().enumerate() {
            let (status, record) = vote(&client, deputy).await;
            assert_eq!(Status::Ok, status);
            let record = record.unwrap();
            assert_eq!(record.voted_deputies.len(), n + 1);
            assert_eq!(record.has_voted, n + 1 == MAX_VOTES);
        }

        let (status, message) = rejection(&client, "6").await;
        assert_eq!(Status::BadRequest, status);
        assert!(message.starts_with("All votes used"), "{message}");

        let record = client
            .get(uri!(votes))
            .dispatch()
            .await
            .into_json::<UserVoteDescription>()
            .await
            .unwrap();
        assert_eq!(record.voted_deputies, ["1", "2", "3", "4", "5"]);
        assert!(record.has_voted);

        let total: u32 = store
            .deputies()
            .await
            .unwrap()
            .iter()
            .map(|deputy| deputy.votes)
            .sum();
        assert_eq!(total as usize, MAX_VOTES);
    }

    #[backend_test(voter)]
    async fn same_deputy_twice_refused(client: Client, store: Storage) {
        let (status, _) = vote(&client, "8").await;
        assert_eq!(Status::Ok, status);

        let (status, message) = rejection(&client, "8").await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!(message, "Already voted for this deputy");

        let deputies = store.deputies().await.unwrap();
        assert_eq!(deputies[0].id, "8");
        assert_eq!(deputies[0].votes, 1);
    }

    #[backend_test(voter)]
    async fn unknown_deputy_not_found(client: Client) {
        let (status, message) = rejection(&client, "404").await;
        assert_eq!(Status::NotFound, status);
        assert_eq!(message, "Deputy '404' not found");

        // The failed attempt does not use up a vote.
        let record = client
            .get(uri!(votes))
            .dispatch()
            .await
            .into_json::<UserVoteDescription>()
            .await
            .unwrap();
        assert!(record.voted_deputies.is_empty());
    }

    #[backend_test(voter)]
    async fn vote_is_broadcast(client: Client) {
        let events = client.rocket().state::<VoteEvents>().unwrap();
        let mut updates = events.subscribe();

        let (status, _) = vote(&client, "11").await;
        assert_eq!(Status::Ok, status);

        let VoteEvent::VoteUpdate { deputies } = updates.recv().await.unwrap();
        assert_eq!(deputies[0].id, "11");
        assert_eq!(deputies[0].votes, 1);
    }

    #[backend_test(voter)]
    async fn broadcasts_follow_vote_order(client: Client, store: Storage) {
        let events = client.rocket().state::<VoteEvents>().unwrap();
        let mut updates = events.subscribe();

        // Another voter casts directly against the store, interleaved with ours.
        let other = crate::model::mongodb::Id::new();
        for (mine, theirs) in [("1", "2"), ("3", "4"), ("5", "6")] {
            vote(&client, mine).await;
            store.cast_vote(other, theirs).await.unwrap();
        }

        let mut totals = Vec::new();
        while let Ok(update) = updates.try_recv() {
            totals.push(update.total_votes());
        }
        assert_eq!(totals, [1, 3, 5]);
    }

    #[backend_test(voter)]
    async fn rejected_vote_is_not_broadcast(client: Client) {
        let events = client.rocket().state::<VoteEvents>().unwrap();
        let mut updates = events.subscribe();

        rejection(&client, "missing").await;
        assert!(updates.try_recv().is_err());
    }
}
