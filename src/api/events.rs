use rocket::{
    response::stream::{Event, EventStream},
    tokio::{select, sync::broadcast::error::RecvError},
    Route, Shutdown, State,
};

use crate::events::VoteEvents;

pub fn routes() -> Vec<Route> {
    routes![events]
}

/// Server-sent events: one `VOTE_UPDATE` message per successful vote.
///
/// Subscribers that fall too far behind skip the missed updates; each update carries the
/// whole leaderboard, so the next one brings them back in sync.
#[get("/api/events")]
pub fn events(events: &State<VoteEvents>, mut shutdown: Shutdown) -> EventStream![] {
    let mut updates = events.subscribe();
    EventStream! {
        loop {
            let update = select! {
                update = updates.recv() => match update {
                    Ok(update) => update,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Event subscriber lagged, skipped {skipped} updates");
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };
            yield Event::json(&update);
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        tokio::io::AsyncReadExt,
    };

    use super::*;

    #[backend_test(voter)]
    async fn streams_vote_updates(client: Client) {
        let mut response = client.get(uri!(events)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(response.content_type(), Some(ContentType::EventStream));

        client
            .post(uri!(crate::api::votes::cast_vote("2")))
            .dispatch()
            .await;

        // Read up to the end of the first event; the stream itself never ends on its own.
        let mut bytes = Vec::new();
        let mut chunk = [0_u8; 256];
        let received = loop {
            let n = response.read(&mut chunk).await.unwrap();
            assert!(n > 0, "stream ended early");
            bytes.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&bytes);
            if text.contains("VOTE_UPDATE") && text.ends_with("\n\n") {
                break text.into_owned();
            }
        };
        assert!(received.contains("data:"), "{received}");
        assert!(
            received.contains("\"type\":\"VOTE_UPDATE\""),
            "{received}"
        );
        assert!(
            received.contains("\"id\":\"2\",\"name\":\"Česlavs Batņa\""),
            "{received}"
        );
    }
}
