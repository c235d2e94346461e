use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::messages::ChatFrame;

/// Handle to one live session held by the registry
///
/// Delivery goes through the outbound channel; the owning session task
/// drains it onto the socket. Pushing never blocks, so no registry lock is
/// ever held across network I/O.
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub display_name: String,
    pub sender: mpsc::UnboundedSender<ChatFrame>,
}

impl SessionHandle {
    pub fn new(display_name: String, sender: mpsc::UnboundedSender<ChatFrame>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            display_name,
            sender,
        }
    }
}

/// In-memory mapping from room ID to the room's live sessions
///
/// This is purely a cache of activity, not the authoritative room record:
/// an entry exists exactly while the room has at least one session.
/// Structural mutations take the write lock; snapshot reads share the read
/// lock and may run concurrently with each other.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Vec<SessionHandle>>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Attaches a session to a room and returns the new occupancy
    pub async fn register(&self, room_id: &str, handle: SessionHandle) -> usize {
        let mut rooms = self.rooms.write().await;
        let sessions = rooms.entry(room_id.to_string()).or_default();
        sessions.push(handle);
        let occupancy = sessions.len();

        debug!(room_id = %room_id, occupancy = occupancy, "Session registered");
        occupancy
    }

    /// Detaches a session from a room; idempotent
    ///
    /// Removing the last session deletes the room entry from memory.
    pub async fn unregister(&self, room_id: &str, session_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(sessions) = rooms.get_mut(room_id) {
            sessions.retain(|s| s.session_id != session_id);
            if sessions.is_empty() {
                rooms.remove(room_id);
                info!(room_id = %room_id, "Empty room removed from registry");
            }
        }
    }

    /// Removes every listed session in one exclusive mutation
    pub async fn evict(&self, room_id: &str, session_ids: &[Uuid]) {
        if session_ids.is_empty() {
            return;
        }

        let mut rooms = self.rooms.write().await;
        if let Some(sessions) = rooms.get_mut(room_id) {
            sessions.retain(|s| !session_ids.contains(&s.session_id));
            if sessions.is_empty() {
                rooms.remove(room_id);
                info!(room_id = %room_id, "Empty room removed from registry");
            }
        }
    }

    /// Point-in-time copy of a room's sessions for the broadcast path
    pub async fn snapshot(&self, room_id: &str) -> Vec<SessionHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned().unwrap_or_default()
    }

    /// Current number of sessions attached to a room
    pub async fn occupancy(&self, room_id: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the room currently has a registry entry
    pub async fn is_tracking(&self, room_id: &str) -> bool {
        let rooms = self.rooms.read().await;
        rooms.contains_key(room_id)
    }
}
