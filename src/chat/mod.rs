// Public API - what other modules can use
pub use broadcast::Broadcaster;
pub use handlers::{chat_socket_handler, create_room, list_user_rooms};
pub use messages::ChatFrame;
pub use registry::{RoomRegistry, SessionHandle};
pub use resolver::RoomIdResolver;
pub use session::ChatSession;
pub use socket::{ChatSocket, SocketError};

// Internal modules
mod broadcast;
mod handlers;
mod messages;
pub mod models;
pub mod registry;
pub mod repository;
mod resolver;
mod session;
mod socket;
