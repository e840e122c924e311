//! Error types for the signaling exchange

use thiserror::Error;

use super::types::Role;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Pairing full: both roles are already claimed")]
    PairingFull,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Malformed description: {0}")]
    MalformedDescription(String),

    #[error("Role not claimed: {0}")]
    RoleNotClaimed(Role),

    #[error("Stale pairing: request for pairing {requested}, current is {current}")]
    StalePairing { requested: u64, current: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
