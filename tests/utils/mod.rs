pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use mocks::{broken_socket, scripted_socket, ChatClient};
#[allow(unused_imports)]
pub use setup::{wait_for_count, wait_for_delivery, wait_for_occupancy, TestSetup, PAIR_ROOM};
