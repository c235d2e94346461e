use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use pairchat::{ChatFrame, ChatSocket, SocketError};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Scripted client socket: inbound frames are fed through a channel and
/// every delivery to the client is recorded
///
/// Dropping the script sender reads as a client disconnect, which is how
/// tests drive a session to Closed.
pub struct ScriptedSocket {
    inbound: mpsc::UnboundedReceiver<String>,
    sent: Arc<Mutex<Vec<String>>>,
    fail_sends: bool,
}

#[async_trait]
impl ChatSocket for ScriptedSocket {
    async fn send(&mut self, message: String) -> Result<(), SocketError> {
        if self.fail_sends {
            return Err(SocketError::SendFailed("socket gone".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<String>, SocketError> {
        Ok(self.inbound.recv().await)
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        Ok(())
    }
}

/// Test-side handle to one scripted socket
pub struct ChatClient {
    script: Option<mpsc::UnboundedSender<String>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ChatClient {
    pub fn send_frame(&self, room_id: &str, name: &str, body: &str) {
        let frame = ChatFrame::new(room_id.to_string(), name.to_string(), body.to_string());
        self.send_raw(&serde_json::to_string(&frame).unwrap());
    }

    pub fn send_raw(&self, text: &str) {
        self.script
            .as_ref()
            .expect("client already disconnected")
            .send(text.to_string())
            .unwrap();
    }

    /// Ends the inbound stream, driving the owning session to Closed
    pub fn disconnect(&mut self) {
        self.script.take();
    }

    /// Every frame delivered to this client so far
    pub fn received(&self) -> Vec<ChatFrame> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    pub fn received_bodies(&self) -> Vec<String> {
        self.received().into_iter().map(|f| f.body).collect()
    }
}

pub fn scripted_socket() -> (Box<ScriptedSocket>, ChatClient) {
    scripted_socket_with_failures(false)
}

/// A socket whose every send fails, for delivery-failure scenarios
pub fn broken_socket() -> (Box<ScriptedSocket>, ChatClient) {
    scripted_socket_with_failures(true)
}

fn scripted_socket_with_failures(fail_sends: bool) -> (Box<ScriptedSocket>, ChatClient) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let socket = Box::new(ScriptedSocket {
        inbound: rx,
        sent: Arc::clone(&sent),
        fail_sends,
    });
    (
        socket,
        ChatClient {
            script: Some(tx),
            sent,
        },
    )
}
