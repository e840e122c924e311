//! In-memory pairing state guarded by a single mutex

use std::sync::{Mutex, MutexGuard};

use super::error::{Error, Result};
use super::types::{Description, Fetch, PairingSnapshot, Phase, Role, SlotStatus};

#[derive(Debug, Default, Clone)]
struct Slot {
    claimed: bool,
    description: Option<Description>,
    /// Holder has fetched the counterpart's current description
    received: bool,
}

/// Both slots of the current pairing plus its sequence number
#[derive(Debug, Default)]
pub struct PairingState {
    slots: [Slot; 2],
    pairing: u64,
}

impl PairingState {
    fn slot(&self, role: Role) -> &Slot {
        &self.slots[role.index()]
    }

    fn slot_mut(&mut self, role: Role) -> &mut Slot {
        &mut self.slots[role.index()]
    }

    pub fn pairing(&self) -> u64 {
        self.pairing
    }

    pub fn is_claimed(&self, role: Role) -> bool {
        self.slot(role).claimed
    }

    pub fn phase(&self) -> Phase {
        let [first, second] = &self.slots;
        match (first.claimed, second.claimed) {
            (false, false) => Phase::Empty,
            (true, false) | (false, true) => Phase::FirstClaimed,
            (true, true) => {
                let done = |s: &Slot| s.description.is_some() && s.received;
                if done(first) && done(second) {
                    Phase::Negotiated
                } else {
                    Phase::BothClaimed
                }
            }
        }
    }

    /// Hand out the first free slot in arrival order
    pub fn claim(&mut self) -> Result<Role> {
        let role = Role::ALL
            .into_iter()
            .find(|r| !self.slot(*r).claimed)
            .ok_or(Error::PairingFull)?;
        *self.slot_mut(role) = Slot {
            claimed: true,
            ..Default::default()
        };
        Ok(role)
    }

    pub fn publish(&mut self, role: Role, description: Description) {
        self.slot_mut(role).description = Some(description);
        // the counterpart has not seen this value yet
        self.slot_mut(role.other()).received = false;
    }

    pub fn fetch_other(&mut self, role: Role) -> Fetch {
        match self.slot(role.other()).description.clone() {
            Some(description) => {
                // only a holder of the role can have seen it
                if self.slot(role).claimed {
                    self.slot_mut(role).received = true;
                }
                Fetch::Available(description)
            }
            None => Fetch::NotAvailable,
        }
    }

    pub fn reset(&mut self) {
        self.slots = Default::default();
        self.pairing += 1;
    }

    pub fn snapshot(&self) -> PairingSnapshot {
        PairingSnapshot {
            pairing: self.pairing,
            phase: self.phase(),
            slots: Role::ALL
                .into_iter()
                .map(|role| {
                    let slot = self.slot(role);
                    SlotStatus {
                        role,
                        claimed: slot.claimed,
                        published: slot.description.is_some(),
                        received: slot.received,
                    }
                })
                .collect(),
        }
    }
}

/// Owned store for one pairing at a time. Every operation takes the lock
/// once, so a claim or publish is never observed half-done.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: Mutex<PairingState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PairingState> {
        // Each mutation is a plain assignment, so a poisoned lock still
        // holds a consistent state.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` with exclusive access to the state
    pub fn transact<R>(&self, f: impl FnOnce(&mut PairingState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn claim_role(&self) -> Result<Role> {
        self.lock().claim()
    }

    pub fn publish(&self, role: Role, description: Description) {
        self.lock().publish(role, description)
    }

    pub fn fetch_other(&self, role: Role) -> Fetch {
        self.lock().fetch_other(role)
    }

    /// Clear all claims and descriptions, returning the pairing number now in effect
    pub fn reset(&self) -> u64 {
        let mut state = self.lock();
        state.reset();
        state.pairing()
    }

    pub fn snapshot(&self) -> PairingSnapshot {
        self.lock().snapshot()
    }
}
