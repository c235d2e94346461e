use std::sync::Arc;
use tracing::{debug, warn};

use super::messages::ChatFrame;
use super::registry::RoomRegistry;

/// Fans one frame out to every live session of a room
///
/// Delivery works off a registry snapshot: a failed recipient never blocks
/// or fails delivery to any other, and failures never surface to the
/// frame's originator. Sessions whose channel is gone are swept out of the
/// registry in a single follow-up mutation.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub async fn broadcast(&self, room_id: &str, frame: &ChatFrame) {
        let sessions = self.registry.snapshot(room_id).await;

        let mut failed = Vec::new();
        for session in &sessions {
            if session.sender.send(frame.clone()).is_err() {
                warn!(
                    room_id = %room_id,
                    display_name = %session.display_name,
                    "Delivery failed, marking session for eviction"
                );
                failed.push(session.session_id);
            }
        }

        if !failed.is_empty() {
            self.registry.evict(room_id, &failed).await;
            debug!(room_id = %room_id, evicted = failed.len(), "Stale sessions evicted");
        }
    }
}
