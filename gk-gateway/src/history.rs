//! Bounded in-memory recognition history
//!
//! Keeps the most recent N events for operator visibility; the oldest
//! event is evicted when full. Not durable. Every recorded event is also
//! broadcast to live subscribers (SSE feed).

use gk_common::api::RecognitionEvent;
use std::collections::VecDeque;
use tokio::sync::{broadcast, RwLock};

pub struct RecognitionHistory {
    capacity: usize,
    /// Newest first
    events: RwLock<VecDeque<RecognitionEvent>>,
    event_tx: broadcast::Sender<RecognitionEvent>,
}

impl RecognitionHistory {
    /// Ring holding at most `capacity` events (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (event_tx, _) = broadcast::channel(64);
        Self {
            capacity,
            events: RwLock::new(VecDeque::with_capacity(capacity)),
            event_tx,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append in completion order, evicting the oldest entry when full
    pub async fn record(&self, event: RecognitionEvent) {
        {
            let mut events = self.events.write().await;
            if events.len() == self.capacity {
                events.pop_back();
            }
            events.push_front(event.clone());
        }
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    pub async fn latest(&self) -> Option<RecognitionEvent> {
        self.events.read().await.front().cloned()
    }

    /// Up to `limit` events, newest first
    pub async fn recent(&self, limit: usize) -> Vec<RecognitionEvent> {
        self.events.read().await.iter().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// Live feed of events recorded from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RecognitionEvent> {
        self.event_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_common::api::Verdict;
    use gk_common::PlateCode;

    fn event(code: &str) -> RecognitionEvent {
        RecognitionEvent::new(Some(PlateCode::new(code).unwrap()), 0.9, Verdict::NotWhitelisted)
    }

    fn plates(events: &[RecognitionEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| e.plate.as_ref().map(|p| p.to_string()).unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_history() {
        let history = RecognitionHistory::new(3);
        assert!(history.latest().await.is_none());
        assert!(history.recent(10).await.is_empty());
        assert!(history.is_empty().await);
    }

    #[tokio::test]
    async fn test_newest_first_and_oldest_evicted() {
        let history = RecognitionHistory::new(3);
        for code in ["AAAA01", "AAAA02", "AAAA03", "AAAA04"] {
            history.record(event(code)).await;
        }

        assert_eq!(history.len().await, 3);
        assert_eq!(plates(&history.recent(10).await), vec!["AAAA04", "AAAA03", "AAAA02"]);
        assert_eq!(
            history.latest().await.unwrap().plate.unwrap().as_str(),
            "AAAA04"
        );
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let history = RecognitionHistory::new(5);
        for code in ["AAAA01", "AAAA02", "AAAA03"] {
            history.record(event(code)).await;
        }
        assert_eq!(plates(&history.recent(2).await), vec!["AAAA03", "AAAA02"]);
        assert!(history.recent(0).await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let history = RecognitionHistory::new(0);
        history.record(event("AAAA01")).await;
        history.record(event("AAAA02")).await;
        assert_eq!(history.capacity(), 1);
        assert_eq!(plates(&history.recent(5).await), vec!["AAAA02"]);
    }

    #[tokio::test]
    async fn test_subscribers_receive_recorded_events() {
        let history = RecognitionHistory::new(2);
        let mut rx = history.subscribe();
        history.record(event("AAAA01")).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.plate.unwrap().as_str(), "AAAA01");
    }
}
