//! Two-slot pairing state for the signaling exchange
//!
//! A pairing has exactly two roles, claimed in arrival order. Each role may
//! publish one opaque description (last write wins) and fetch the other
//! role's description once it exists.

mod error;
mod store;
mod types;

pub use error::{Error, Result};
pub use store::{PairingState, SessionStore};
pub use types::{
    Arrival, Description, Fetch, PairingSnapshot, Phase, PublishRequest, Role, SlotStatus,
};
