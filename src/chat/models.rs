use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for a persisted chat message
///
/// Messages are append-only; `sent_at` is the canonical ordering key.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageRecord {
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Creates a new message record stamped with the current time
    pub fn new(room_id: String, sender_id: String, sender_name: String, body: String) -> Self {
        Self {
            room_id,
            sender_id,
            sender_name,
            body,
            sent_at: Utc::now(),
        }
    }
}

/// Database model for a persisted two-party room
///
/// `room_id` is a deterministic function of the unordered user pair;
/// `user_a`/`user_b` hold the pair's stable identifiers ordered by account
/// creation time. A persisted room may have zero active sessions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RoomRecord {
    pub room_id: String,
    pub user_a: String,
    pub user_b: String,
    pub created_at: DateTime<Utc>,
}

/// Durable identity of a participant, owned by the account subsystem
///
/// Consumed read-only here: `id` is the stable unique identifier and
/// `created_at` the account-creation time used to order identity pairs.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub created_at: DateTime<Utc>,
}
