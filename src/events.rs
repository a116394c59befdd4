use std::sync::{Mutex, PoisonError};

use rocket::tokio::sync::broadcast::{self, Receiver, Sender};

use crate::model::api::event::VoteEvent;

/// How many events a slow subscriber may fall behind before it starts skipping.
const CHANNEL_CAPACITY: usize = 64;

/// Fan-out of [`VoteEvent`]s to every live subscriber.
///
/// Lives in managed state; each event stream holds its own [`Receiver`].
/// Vote totals only grow, so a leaderboard with fewer votes than one already sent is
/// out of date and is never delivered.
pub struct VoteEvents {
    sender: Sender<VoteEvent>,
    /// Total votes in the newest leaderboard sent so far.
    newest: Mutex<Option<u64>>,
}

impl VoteEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            newest: Mutex::new(None),
        }
    }

    /// Push an event to all current subscribers, returning how many there were.
    ///
    /// Returns `None` without sending if a newer leaderboard has already gone out.
    pub fn publish(&self, event: VoteEvent) -> Option<usize> {
        let total = event.total_votes();
        let mut newest = self.newest.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*newest, Some(sent) if total <= sent) {
            return None;
        }
        *newest = Some(total);
        // Sending only fails when nobody is listening, which is fine.
        Some(self.sender.send(event).unwrap_or(0))
    }

    /// Start receiving events published from now on.
    pub fn subscribe(&self) -> Receiver<VoteEvent> {
        self.sender.subscribe()
    }
}

impl Default for VoteEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::api::deputy::DeputyDescription;

    use super::*;

    fn update(votes: &[u32]) -> VoteEvent {
        let deputies = votes
            .iter()
            .enumerate()
            .map(|(n, &votes)| DeputyDescription {
                id: (n + 1).to_string(),
                name: format!("Deputy {}", n + 1),
                faction: "Frakcija".to_string(),
                votes,
            })
            .collect();
        VoteEvent::VoteUpdate { deputies }
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let events = VoteEvents::new();
        assert_eq!(events.publish(update(&[1])), Some(0));
    }

    #[rocket::async_test]
    async fn every_subscriber_receives() {
        let events = VoteEvents::new();
        let mut first = events.subscribe();
        let mut second = events.subscribe();

        assert_eq!(events.publish(update(&[1])), Some(2));
        assert_eq!(first.recv().await.unwrap(), update(&[1]));
        assert_eq!(second.recv().await.unwrap(), update(&[1]));
    }

    #[rocket::async_test]
    async fn stale_leaderboard_never_follows_newer_one() {
        let events = VoteEvents::new();
        let mut updates = events.subscribe();

        // Two votes finish in one order but reach the broadcast in the other.
        assert_eq!(events.publish(update(&[2, 1])), Some(1));
        assert_eq!(events.publish(update(&[1, 1])), None);
        assert_eq!(events.publish(update(&[2, 1])), None);

        assert_eq!(updates.recv().await.unwrap(), update(&[2, 1]));
        assert!(updates.try_recv().is_err());

        assert_eq!(events.publish(update(&[2, 2])), Some(1));
        assert_eq!(updates.recv().await.unwrap(), update(&[2, 2]));
    }
}
