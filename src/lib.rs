//! Two-party WebRTC signaling relay: hands out roles, relays descriptions

pub mod config;
pub mod coordinator;
pub mod server;
pub mod session;

pub use config::Config;
pub use coordinator::ExchangeCoordinator;
pub use server::TandemServer;
pub use session::{Description, Fetch, Role, SessionStore};
