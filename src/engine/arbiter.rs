//! Arbiter capability.
//!
//! Settlement authority is proven by possessing an `ArbiterCap`, not by
//! presenting an address. The capability is issued once at startup; the
//! engine records its public `CapId` and later checks presented
//! capabilities by identity. The token itself is sealed (private field,
//! no `Clone`), so code outside this module cannot forge one, and there
//! is exactly one holder unless it is explicitly moved.

use std::fmt;
use uuid::Uuid;

/// Public identity of a capability. Safe to copy and store; useless for
/// authorization without the capability itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapId(Uuid);

impl fmt::Display for CapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The unforgeable settlement capability. Not `Clone`: transferring
/// authority means moving the value.
pub struct ArbiterCap {
    id: CapId,
}

impl ArbiterCap {
    /// Mint a fresh capability. Called once at system initialization;
    /// whoever holds the returned value is the arbiter.
    pub fn issue() -> Self {
        ArbiterCap { id: CapId(Uuid::new_v4()) }
    }

    pub fn id(&self) -> CapId {
        self.id
    }
}

impl fmt::Debug for ArbiterCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the id of a live capability in full.
        f.debug_struct("ArbiterCap").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
