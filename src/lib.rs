// Library crate for the pairchat server
// This file exposes the public API for integration tests

pub mod chat;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use chat::{
    Broadcaster, ChatFrame, ChatSession, ChatSocket, RoomIdResolver, RoomRegistry, SessionHandle,
    SocketError,
};
pub use shared::{AppError, AppState};
