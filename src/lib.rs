// Public API for integration tests and potential library usage

pub mod config;
pub mod error;
pub mod protocol;
pub mod rules;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;

// Re-export broadcast for testing
pub mod broadcast;
