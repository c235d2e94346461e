use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{MessageRecord, RoomRecord, UserIdentity};
use crate::shared::AppError;

/// Trait for chat persistence operations
///
/// The core consumes accounts and durable chat state exclusively through
/// this gateway; registration, login and token handling live elsewhere.
#[async_trait]
pub trait ChatRepository {
    /// Idempotently creates the room row for an identity pair
    async fn ensure_room(&self, room_id: &str, user_a: &str, user_b: &str)
        -> Result<(), AppError>;

    /// Appends one message to the room's durable log
    async fn save_message(
        &self,
        room_id: &str,
        sender_id: &str,
        sender_name: &str,
        body: &str,
    ) -> Result<(), AppError>;

    /// Returns the most recent `limit` messages of a room in ascending time order
    async fn get_history(&self, room_id: &str, limit: i64) -> Result<Vec<MessageRecord>, AppError>;

    /// Checks whether a username is known to the account subsystem
    async fn user_exists(&self, username: &str) -> Result<bool, AppError>;

    /// Resolves a username to its durable identity, NotFound if absent
    async fn get_user_identity(&self, username: &str) -> Result<UserIdentity, AppError>;

    /// Lists every room the username participates in, either side of the pair
    async fn list_rooms_for_user(&self, username: &str) -> Result<Vec<RoomRecord>, AppError>;
}

/// In-memory implementation of ChatRepository for development and testing
///
/// This provides a realistic implementation that can be used in development
/// without requiring a real database connection. Data is stored in memory
/// and will be lost when the application restarts.
pub struct InMemoryChatRepository {
    users: Mutex<HashMap<String, UserIdentity>>,
    rooms: Mutex<HashMap<String, RoomRecord>>,
    messages: Mutex<Vec<MessageRecord>>,
}

impl Default for InMemoryChatRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChatRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated user identities
    pub fn with_users(users: Vec<(String, UserIdentity)>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.users.lock().unwrap();
            for (username, identity) in users {
                map.insert(username, identity);
            }
        }
        repo
    }

    /// Adds a user identity under the given username
    pub fn insert_user(&self, username: &str, identity: UserIdentity) {
        self.users
            .lock()
            .unwrap()
            .insert(username.to_string(), identity);
    }

    /// Appends a pre-built message record, bypassing the timestamp stamping
    pub fn insert_message(&self, record: MessageRecord) {
        self.messages.lock().unwrap().push(record);
    }

    /// Returns the total number of persisted messages
    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Checks if a room row exists by ID (useful for assertions)
    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.lock().unwrap().contains_key(room_id)
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    #[instrument(skip(self))]
    async fn ensure_room(
        &self,
        room_id: &str,
        user_a: &str,
        user_b: &str,
    ) -> Result<(), AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        if rooms.contains_key(room_id) {
            debug!(room_id = %room_id, "Room already exists in memory");
            return Ok(());
        }

        rooms.insert(
            room_id.to_string(),
            RoomRecord {
                room_id: room_id.to_string(),
                user_a: user_a.to_string(),
                user_b: user_b.to_string(),
                created_at: Utc::now(),
            },
        );

        debug!(room_id = %room_id, "Room created in memory");
        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn save_message(
        &self,
        room_id: &str,
        sender_id: &str,
        sender_name: &str,
        body: &str,
    ) -> Result<(), AppError> {
        let record = MessageRecord::new(
            room_id.to_string(),
            sender_id.to_string(),
            sender_name.to_string(),
            body.to_string(),
        );

        self.messages.lock().unwrap().push(record);

        debug!(room_id = %room_id, sender_name = %sender_name, "Message saved in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_history(&self, room_id: &str, limit: i64) -> Result<Vec<MessageRecord>, AppError> {
        let messages = self.messages.lock().unwrap();

        let mut history: Vec<MessageRecord> = messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));

        // Most recent `limit` rows, still ascending
        let skip = history.len().saturating_sub(limit.max(0) as usize);
        let history = history.split_off(skip);

        debug!(room_id = %room_id, count = history.len(), "History fetched from memory");
        Ok(history)
    }

    #[instrument(skip(self))]
    async fn user_exists(&self, username: &str) -> Result<bool, AppError> {
        let exists = self.users.lock().unwrap().contains_key(username);
        debug!(username = %username, exists = exists, "User presence check in memory");
        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn get_user_identity(&self, username: &str) -> Result<UserIdentity, AppError> {
        let users = self.users.lock().unwrap();
        match users.get(username) {
            Some(identity) => {
                debug!(username = %username, user_id = %identity.id, "Identity found in memory");
                Ok(identity.clone())
            }
            None => {
                debug!(username = %username, "Identity not found in memory");
                Err(AppError::NotFound(format!("user not found: {}", username)))
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_rooms_for_user(&self, username: &str) -> Result<Vec<RoomRecord>, AppError> {
        let user_id = {
            let users = self.users.lock().unwrap();
            match users.get(username) {
                Some(identity) => identity.id.clone(),
                None => return Ok(Vec::new()),
            }
        };

        let rooms = self.rooms.lock().unwrap();
        let rooms: Vec<RoomRecord> = rooms
            .values()
            .filter(|r| r.user_a == user_id || r.user_b == user_id)
            .cloned()
            .collect();

        debug!(username = %username, count = rooms.len(), "Rooms listed from memory");
        Ok(rooms)
    }
}

/// PostgreSQL implementation of chat repository
pub struct PostgresChatRepository {
    pool: PgPool,
}

impl PostgresChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PostgresChatRepository {
    #[instrument(skip(self))]
    async fn ensure_room(
        &self,
        room_id: &str,
        user_a: &str,
        user_b: &str,
    ) -> Result<(), AppError> {
        debug!(room_id = %room_id, "Ensuring room exists in database");

        sqlx::query(
            "INSERT INTO rooms (room_id, user_a, user_b, created_at) VALUES ($1, $2, $3, $4) ON CONFLICT (room_id) DO NOTHING"
        )
        .bind(room_id)
        .bind(user_a)
        .bind(user_b)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, room_id = %room_id, "Failed to ensure room in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn save_message(
        &self,
        room_id: &str,
        sender_id: &str,
        sender_name: &str,
        body: &str,
    ) -> Result<(), AppError> {
        debug!(room_id = %room_id, sender_name = %sender_name, "Saving message in database");

        sqlx::query(
            "INSERT INTO messages (room_id, sender_id, sender_name, body, sent_at) VALUES ($1, $2, $3, $4, $5)"
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(sender_name)
        .bind(body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, room_id = %room_id, "Failed to save message in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_history(&self, room_id: &str, limit: i64) -> Result<Vec<MessageRecord>, AppError> {
        debug!(room_id = %room_id, limit = limit, "Fetching history from database");

        let rows = sqlx::query(
            "SELECT room_id, sender_id, sender_name, body, sent_at FROM ( \
                SELECT room_id, sender_id, sender_name, body, sent_at \
                FROM messages WHERE room_id = $1 \
                ORDER BY sent_at DESC LIMIT $2 \
            ) recent ORDER BY sent_at ASC",
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, room_id = %room_id, "Failed to fetch history from database");
            AppError::DatabaseError(e.to_string())
        })?;

        let history = rows
            .into_iter()
            .map(|row| MessageRecord {
                room_id: row.get("room_id"),
                sender_id: row.get("sender_id"),
                sender_name: row.get("sender_name"),
                body: row.get("body"),
                sent_at: row.get("sent_at"),
            })
            .collect();

        Ok(history)
    }

    #[instrument(skip(self))]
    async fn user_exists(&self, username: &str) -> Result<bool, AppError> {
        debug!(username = %username, "Checking user presence in database");

        let row = sqlx::query("SELECT 1 FROM users WHERE username = $1 LIMIT 1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, username = %username, "Failed to check user in database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(row.is_some())
    }

    #[instrument(skip(self))]
    async fn get_user_identity(&self, username: &str) -> Result<UserIdentity, AppError> {
        debug!(username = %username, "Fetching user identity from database");

        let row = sqlx::query("SELECT id, created_at FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, username = %username, "Failed to fetch identity from database");
                AppError::DatabaseError(e.to_string())
            })?;

        match row {
            Some(row) => Ok(UserIdentity {
                id: row.get("id"),
                created_at: row.get("created_at"),
            }),
            None => {
                debug!(username = %username, "Identity not found in database");
                Err(AppError::NotFound(format!("user not found: {}", username)))
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_rooms_for_user(&self, username: &str) -> Result<Vec<RoomRecord>, AppError> {
        debug!(username = %username, "Listing rooms from database");

        let rows = sqlx::query(
            "SELECT room_id, user_a, user_b, created_at FROM rooms \
             WHERE user_a = (SELECT id FROM users WHERE username = $1) \
                OR user_b = (SELECT id FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, username = %username, "Failed to list rooms from database");
            AppError::DatabaseError(e.to_string())
        })?;

        let rooms = rows
            .into_iter()
            .map(|row| RoomRecord {
                room_id: row.get("room_id"),
                user_a: row.get("user_a"),
                user_b: row.get("user_b"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(rooms)
    }
}
