use serde::{Deserialize, Serialize};

use super::models::MessageRecord;

/// Wire-level chat frame exchanged with clients
///
/// The first frame sent on a stream doubles as the handshake payload: it
/// names the room and the sender, and its body becomes the first chat line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatFrame {
    pub room_id: String,
    pub sender_display_name: String,
    pub body: String,
}

impl ChatFrame {
    pub fn new(room_id: String, sender_display_name: String, body: String) -> Self {
        Self {
            room_id,
            sender_display_name,
            body,
        }
    }
}

impl From<&MessageRecord> for ChatFrame {
    fn from(record: &MessageRecord) -> Self {
        Self {
            room_id: record.room_id.clone(),
            sender_display_name: record.sender_name.clone(),
            body: record.body.clone(),
        }
    }
}
