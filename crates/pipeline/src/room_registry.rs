//! Session-scoped event rooms: a `session_id`-keyed table of broadcast
//! channels the orchestrator publishes [`PipelineEvent`]s into and the
//! WebSocket layer subscribes to. Mirrors the teacher's per-run
//! broadcast channels in `runtime::runs::RunStore`, generalized to a
//! named room instead of a run id.

use std::collections::HashMap;

use goalconvo_domain::events::PipelineEvent;
use parking_lot::RwLock;
use tokio::sync::broadcast;

const ROOM_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, broadcast::Sender<PipelineEvent>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to `session_id`'s room, creating it if this is the
    /// first subscriber.
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<PipelineEvent> {
        let mut rooms = self.rooms.write();
        let tx = rooms
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0);
        tx.subscribe()
    }

    /// Publish an event into `session_id`'s room. A no-op if nobody has
    /// subscribed yet (the orchestrator does not require a listener to
    /// make progress).
    pub fn emit(&self, session_id: &str, event: PipelineEvent) {
        let rooms = self.rooms.read();
        if let Some(tx) = rooms.get(session_id) {
            let _ = tx.send(event);
        }
    }

    /// Drop the room's channel once the owning run has finished and no
    /// further events will be published into it.
    pub fn close(&self, session_id: &str) {
        self.rooms.write().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(session_id: &str) -> PipelineEvent {
        PipelineEvent::Log {
            run_id: session_id.to_string(),
            level: "info".into(),
            message: "hi".into(),
            step: "test".into(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_events_for_its_session_only() {
        let registry = RoomRegistry::new();
        let mut rx_a = registry.subscribe("a");
        let mut rx_b = registry.subscribe("b");

        registry.emit("a", log("a"));

        let received = rx_a.recv().await.unwrap();
        assert_eq!(received.run_id(), "a");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn emit_to_unsubscribed_session_does_not_panic() {
        let registry = RoomRegistry::new();
        registry.emit("nobody-home", log("x"));
    }

    #[tokio::test]
    async fn close_drops_the_channel() {
        let registry = RoomRegistry::new();
        let rx = registry.subscribe("a");
        registry.close("a");
        drop(rx);
        registry.emit("a", log("a"));
    }
}
