use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

use pairchat::chat::models::{MessageRecord, UserIdentity};
use pairchat::chat::repository::{ChatRepository, InMemoryChatRepository};
use pairchat::{AppError, ChatSession, RoomRegistry};

use super::mocks::{scripted_socket, ChatClient};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// The room ID the seeded alice/bob pair derives to
pub const PAIR_ROOM: &str = "u-au-b";

pub struct TestSetup {
    pub repository: Arc<InMemoryChatRepository>,
    pub registry: Arc<RoomRegistry>,
}

impl TestSetup {
    /// Fresh setup seeded with the alice/bob identity pair
    ///
    /// alice's account predates bob's, so her identifier contributes the
    /// first room-ID prefix.
    pub fn with_pair() -> Self {
        let now = Utc::now();
        let repository = Arc::new(InMemoryChatRepository::with_users(vec![
            (
                "alice".to_string(),
                UserIdentity {
                    id: "u-alice-uuid".to_string(),
                    created_at: now - Duration::hours(48),
                },
            ),
            (
                "bob".to_string(),
                UserIdentity {
                    id: "u-bob-uuid".to_string(),
                    created_at: now - Duration::hours(24),
                },
            ),
        ]));

        Self {
            repository,
            registry: Arc::new(RoomRegistry::new()),
        }
    }

    /// Adds another known user to the account store
    pub fn add_user(&self, username: &str, user_id: &str) {
        self.repository.insert_user(
            username,
            UserIdentity {
                id: user_id.to_string(),
                created_at: Utc::now() - Duration::hours(1),
            },
        );
    }

    /// Preloads a persisted message with an explicit age
    pub fn preload_message(&self, room_id: &str, sender: &str, body: &str, minutes_ago: i64) {
        self.repository.insert_message(MessageRecord {
            room_id: room_id.to_string(),
            sender_id: format!("u-{}-uuid", sender),
            sender_name: sender.to_string(),
            body: body.to_string(),
            sent_at: Utc::now() - Duration::minutes(minutes_ago),
        });
    }

    /// Spawns one session task over a scripted socket
    pub fn spawn_session(&self) -> (ChatClient, JoinHandle<Result<(), AppError>>) {
        let (socket, client) = scripted_socket();
        let repository: Arc<dyn ChatRepository + Send + Sync> = self.repository.clone();
        let session = ChatSession::new(repository, Arc::clone(&self.registry));
        let task = tokio::spawn(session.run(socket));
        (client, task)
    }
}

/// Polls until a room reaches the expected occupancy, panicking after two seconds
pub async fn wait_for_occupancy(registry: &RoomRegistry, room_id: &str, expected: usize) {
    for _ in 0..200 {
        if registry.occupancy(room_id).await == expected {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("room {} never reached occupancy {}", room_id, expected);
}

/// Polls until a client has received a frame with the given body
pub async fn wait_for_delivery(client: &ChatClient, body: &str) {
    for _ in 0..200 {
        if client.received_bodies().iter().any(|b| b == body) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("client never received {:?}", body);
}

/// Polls until a client has received at least `count` frames
pub async fn wait_for_count(client: &ChatClient, count: usize) {
    for _ in 0..200 {
        if client.received().len() >= count {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("client never received {} frames", count);
}
