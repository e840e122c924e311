//! Exchange coordinator
//!
//! Turns participant requests into session store operations:
//! - arrive: claim the next free role (restarting a finished pairing first)
//! - publish: store a role's description
//! - fetch_other: return the counterpart's description, or NotAvailable

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::session::{
    Arrival, Description, Error, Fetch, PairingSnapshot, Phase, Result, Role, SessionStore,
};

pub struct ExchangeCoordinator {
    store: Arc<SessionStore>,
}

impl ExchangeCoordinator {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Assign a role to a newly arriving participant.
    ///
    /// A negotiated pairing is reset before claiming, in the same critical
    /// section, so the arrival becomes First of a new pairing. While both
    /// roles are held and negotiation is still running the arrival gets
    /// [`Error::PairingFull`].
    pub fn arrive(&self) -> Result<Arrival> {
        let result = self.store.transact(|state| {
            if state.phase() == Phase::Negotiated {
                let previous = state.pairing();
                state.reset();
                info!("Pairing {} negotiated, starting pairing {}", previous, state.pairing());
            }
            state.claim().map(|role| Arrival {
                role,
                pairing: state.pairing(),
            })
        });

        match &result {
            Ok(arrival) => info!("Assigned role {} in pairing {}", arrival.role, arrival.pairing),
            Err(e) => warn!("Rejected arrival: {}", e),
        }
        result
    }

    /// Store `description` for the role identified by `role_id`
    pub fn publish(&self, role_id: i64, description: Description) -> Result<Role> {
        self.publish_checked(None, role_id, description)
    }

    /// Like [`publish`](Self::publish), but only while `pairing` is the
    /// current pairing. A page left over from an earlier pairing gets
    /// [`Error::StalePairing`] instead of overwriting the new holder's
    /// description.
    pub fn publish_in(&self, pairing: u64, role_id: i64, description: Description) -> Result<Role> {
        self.publish_checked(Some(pairing), role_id, description)
    }

    fn publish_checked(
        &self,
        pairing: Option<u64>,
        role_id: i64,
        description: Description,
    ) -> Result<Role> {
        let role = Role::from_id(role_id)?;
        self.store.transact(|state| {
            check_pairing(state.pairing(), pairing)?;
            if !state.is_claimed(role) {
                return Err(Error::RoleNotClaimed(role));
            }
            state.publish(role, description);
            info!("Role {} published description in pairing {}", role, state.pairing());
            Ok(role)
        })
    }

    /// Description published by the role other than `role_id`
    pub fn fetch_other(&self, role_id: i64) -> Result<Fetch> {
        self.fetch_checked(None, role_id)
    }

    /// Like [`fetch_other`](Self::fetch_other), scoped to `pairing`
    pub fn fetch_other_in(&self, pairing: u64, role_id: i64) -> Result<Fetch> {
        self.fetch_checked(Some(pairing), role_id)
    }

    fn fetch_checked(&self, pairing: Option<u64>, role_id: i64) -> Result<Fetch> {
        let role = Role::from_id(role_id)?;
        let fetch = self.store.transact(|state| {
            check_pairing(state.pairing(), pairing).map(|()| state.fetch_other(role))
        })?;

        if fetch.is_available() {
            info!("Delivered {} description to role {}", role.other(), role);
        } else {
            debug!("No {} description yet for role {}", role.other(), role);
        }
        Ok(fetch)
    }

    /// Abandon the current pairing. Returns the new pairing number.
    pub fn reset(&self) -> u64 {
        let pairing = self.store.reset();
        info!("Pairing reset, now on pairing {}", pairing);
        pairing
    }

    pub fn status(&self) -> PairingSnapshot {
        self.store.snapshot()
    }
}

fn check_pairing(current: u64, requested: Option<u64>) -> Result<()> {
    match requested {
        Some(requested) if requested != current => {
            Err(Error::StalePairing { requested, current })
        }
        _ => Ok(()),
    }
}
