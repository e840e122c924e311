//! Pairing types shared by the store, the coordinator and the HTTP layer

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// One of the two participant slots in a pairing.
///
/// On the wire roles are the integers `1` and `2`, as used by the meeting page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    First,
    Second,
}

impl Role {
    /// Claim order for new arrivals
    pub const ALL: [Role; 2] = [Role::First, Role::Second];

    pub fn id(&self) -> u8 {
        match self {
            Role::First => 1,
            Role::Second => 2,
        }
    }

    pub fn from_id(id: i64) -> Result<Self> {
        match id {
            1 => Ok(Role::First),
            2 => Ok(Role::Second),
            other => Err(Error::UnknownRole(other.to_string())),
        }
    }

    /// Parse a role from a path segment such as `/meet/2`. Only the exact
    /// ids are accepted, so `01` or `+1` are unknown roles.
    pub fn from_segment(segment: &str) -> Result<Self> {
        match segment {
            "1" => Ok(Role::First),
            "2" => Ok(Role::Second),
            other => Err(Error::UnknownRole(other.to_string())),
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Role::First => Role::Second,
            Role::Second => Role::First,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Role::First => 0,
            Role::Second => 1,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::First => write!(f, "first"),
            Role::Second => write!(f, "second"),
        }
    }
}

/// Session description published by a role, with any bundled candidates.
///
/// The relay never looks inside it: the other participant gets back the
/// same JSON value that was posted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Description(serde_json::Value);

impl Description {
    /// Wrap a JSON value. `null` is rejected so that "nothing published"
    /// can never be confused with a real payload.
    pub fn new(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Err(Error::MalformedDescription("description is null".into()));
        }
        Ok(Self(value))
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Body of a publish request: `{"id": 1, "offer": {...}, "pairing": 0}`.
/// `pairing` is optional; when present the publish is scoped to it.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    pub id: i64,
    pub offer: serde_json::Value,
    #[serde(default)]
    pub pairing: Option<u64>,
}

impl PublishRequest {
    /// Decode a raw request body. Anything that is not a JSON object with an
    /// integer `id` and an `offer` field is malformed.
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::MalformedDescription(e.to_string()))
    }
}

/// Result of asking for the counterpart's description
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    Available(Description),
    /// Counterpart has not published yet (or never claimed); poll again later
    NotAvailable,
}

impl Fetch {
    pub fn is_available(&self) -> bool {
        matches!(self, Fetch::Available(_))
    }
}

/// Where the current pairing is in its handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Empty,
    FirstClaimed,
    BothClaimed,
    /// Both published and both fetched the other's latest description
    Negotiated,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Empty => write!(f, "empty"),
            Phase::FirstClaimed => write!(f, "first_claimed"),
            Phase::BothClaimed => write!(f, "both_claimed"),
            Phase::Negotiated => write!(f, "negotiated"),
        }
    }
}

/// Successful arrival: the role handed out and the pairing it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub role: Role,
    pub pairing: u64,
}

/// Per-role view inside a [`PairingSnapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub role: Role,
    pub claimed: bool,
    pub published: bool,
    pub received: bool,
}

/// Consistent read-only copy of the pairing state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingSnapshot {
    pub pairing: u64,
    pub phase: Phase,
    pub slots: Vec<SlotStatus>,
}

impl PairingSnapshot {
    pub fn slot(&self, role: Role) -> &SlotStatus {
        &self.slots[role.index()]
    }
}
