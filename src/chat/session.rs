use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::broadcast::Broadcaster;
use super::messages::ChatFrame;
use super::registry::{RoomRegistry, SessionHandle};
use super::repository::ChatRepository;
use super::socket::ChatSocket;
use crate::shared::AppError;

/// Number of persisted messages replayed to a newly joined session
const HISTORY_REPLAY_LIMIT: i64 = 50;

/// Drives one client connection through its whole life
///
/// Handshake, identity check and history replay happen before the session
/// becomes visible to the room; after registration the session sits in a
/// duplex loop until the transport goes away. There is no idle timeout: a
/// connected-but-silent session holds its registry slot until the client
/// disconnects.
pub struct ChatSession {
    repository: Arc<dyn ChatRepository + Send + Sync>,
    registry: Arc<RoomRegistry>,
    broadcaster: Broadcaster,
}

impl ChatSession {
    pub fn new(
        repository: Arc<dyn ChatRepository + Send + Sync>,
        registry: Arc<RoomRegistry>,
    ) -> Self {
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self {
            repository,
            registry,
            broadcaster,
        }
    }

    /// Runs the session until the connection closes
    ///
    /// Errors are only returned for handshake-stage failures; once the
    /// session is registered every failure is absorbed locally and the
    /// registry slot is released on the way out.
    #[instrument(name = "chat_session", skip(self, socket))]
    pub async fn run(self, mut socket: Box<dyn ChatSocket>) -> Result<(), AppError> {
        // The first frame is both handshake and first chat line
        let first = match socket.receive().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("Stream closed before handshake");
                return Ok(());
            }
            Err(e) => {
                return Err(AppError::Validation(format!(
                    "handshake receive failed: {:?}",
                    e
                )))
            }
        };

        let handshake: ChatFrame = serde_json::from_str(&first)
            .map_err(|e| AppError::Validation(format!("malformed handshake frame: {}", e)))?;
        if handshake.room_id.is_empty() {
            return Err(AppError::Validation("room ID is empty".to_string()));
        }
        if handshake.sender_display_name.is_empty() {
            return Err(AppError::Validation("display name is empty".to_string()));
        }

        let room_id = handshake.room_id.clone();
        let display_name = handshake.sender_display_name.clone();

        // Unknown participants never reach the registry or the store
        let identity = match self.repository.get_user_identity(&display_name).await {
            Ok(identity) => identity,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Unauthorized(format!(
                    "unknown participant: {}",
                    display_name
                )));
            }
            Err(e) => return Err(e),
        };
        let sender_id = identity.id;

        self.replay_history(socket.as_mut(), &room_id).await;

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(display_name.clone(), outbound_tx);
        let session_id = handle.session_id;
        let occupancy = self.registry.register(&room_id, handle).await;
        info!(
            room_id = %room_id,
            display_name = %display_name,
            occupancy = occupancy,
            "Session joined room"
        );

        // The handshake body is the join line; the new session is already
        // registered and receives it like everyone else
        self.persist_and_broadcast(&room_id, &sender_id, &display_name, &handshake.body)
            .await;

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(frame) => {
                            let payload = serde_json::to_string(&frame).unwrap();
                            if let Err(e) = socket.send(payload).await {
                                warn!(
                                    room_id = %room_id,
                                    display_name = %display_name,
                                    error = ?e,
                                    "Outbound send failed, closing session"
                                );
                                break;
                            }
                        }
                        None => break,
                    }
                }

                inbound = socket.receive() => {
                    match inbound {
                        Ok(Some(text)) => {
                            self.handle_inbound(&room_id, &sender_id, &display_name, &text)
                                .await;
                        }
                        Ok(None) => {
                            debug!(display_name = %display_name, "Client disconnected");
                            break;
                        }
                        Err(e) => {
                            warn!(
                                display_name = %display_name,
                                error = ?e,
                                "Receive failed, closing session"
                            );
                            break;
                        }
                    }
                }
            }
        }

        // Single cleanup point for every path out of the loop
        self.registry.unregister(&room_id, session_id).await;
        info!(room_id = %room_id, display_name = %display_name, "Session left room");
        let _ = socket.close().await;
        Ok(())
    }

    /// Replays recent room history to this socket only, oldest first
    ///
    /// Runs before registration so live broadcasts can't interleave with
    /// the replay. A load failure joins with an empty replay; a delivery
    /// failure abandons the rest of the replay but not the join.
    async fn replay_history(&self, socket: &mut dyn ChatSocket, room_id: &str) {
        let history = match self.repository.get_history(room_id, HISTORY_REPLAY_LIMIT).await {
            Ok(history) => history,
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "History load failed, joining without replay");
                return;
            }
        };

        for record in &history {
            let payload = serde_json::to_string(&ChatFrame::from(record)).unwrap();
            if let Err(e) = socket.send(payload).await {
                warn!(room_id = %room_id, error = ?e, "Replay delivery failed, abandoning replay");
                break;
            }
        }
    }

    async fn handle_inbound(&self, room_id: &str, sender_id: &str, display_name: &str, text: &str) {
        let frame: ChatFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(display_name = %display_name, error = %e, "Discarding malformed inbound frame");
                return;
            }
        };

        // Empty bodies are dropped without persistence or broadcast
        if frame.body.is_empty() {
            return;
        }

        // The room and display name are fixed at handshake; inbound frames
        // cannot redirect a session to another room
        self.persist_and_broadcast(room_id, sender_id, display_name, &frame.body)
            .await;
    }

    /// Persists then fans out one message; storage failures are absorbed
    async fn persist_and_broadcast(
        &self,
        room_id: &str,
        sender_id: &str,
        display_name: &str,
        body: &str,
    ) {
        if let Err(e) = self
            .repository
            .save_message(room_id, sender_id, display_name, body)
            .await
        {
            warn!(room_id = %room_id, error = %e, "Failed to persist message, continuing");
        }

        let frame = ChatFrame::new(
            room_id.to_string(),
            display_name.to_string(),
            body.to_string(),
        );
        self.broadcaster.broadcast(room_id, &frame).await;
    }
}
