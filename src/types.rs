//! Shared types for the ARENA escrow service.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that the ledger, engine,
//! and API modules can depend on them without circular references.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Account identifier
// ---------------------------------------------------------------------------

/// An opaque account identifier (a chain address in the deployed system).
///
/// The engine never inspects the contents — it only compares identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(addr: impl Into<String>) -> Self {
        AccountId(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        AccountId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Match identifier
// ---------------------------------------------------------------------------

/// Unique identifier of a Match. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(Uuid);

impl MatchId {
    pub fn generate() -> Self {
        MatchId(Uuid::new_v4())
    }

    /// Parse a match id from its string form (API path segments).
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(MatchId)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Match status & snapshot
// ---------------------------------------------------------------------------

/// Live states of a Match. Settled and Cancelled are terminal and are
/// represented by removal from the store plus an emitted event — there is
/// no residual object to carry a status for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Created; waiting for the opponent's stake.
    Open,
    /// Both stakes custodied; only settle can release the funds.
    Ready,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Open => write!(f, "OPEN"),
            MatchStatus::Ready => write!(f, "READY"),
        }
    }
}

/// Read-only snapshot of a Match for observers (API, logs).
///
/// Deliberately does not expose the custody objects themselves — only
/// the agreed stake amount per player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetails {
    pub id: MatchId,
    pub initiator: AccountId,
    pub opponent: AccountId,
    /// Stake per player, in raw token units.
    pub stake_amount: u64,
    pub ready: bool,
    /// The account recorded as arbiter (display only; settlement authority
    /// is proven by capability, not by this field).
    pub arbiter: AccountId,
}

impl fmt::Display for MatchDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} vs {} (stake: {} | {})",
            self.id,
            self.initiator,
            self.opponent,
            self.stake_amount,
            if self.ready { MatchStatus::Ready } else { MatchStatus::Open },
        )
    }
}

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Every way an escrow operation can be rejected.
///
/// All of these are whole-operation rejections: no partial state change,
/// no fund movement. None is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscrowError {
    #[error("initiator and opponent must be different accounts")]
    SelfMatchNotAllowed,

    #[error("stake amount must be greater than zero")]
    InvalidStakeAmount,

    #[error("caller is not authorized for this operation")]
    NotAuthorized,

    #[error("opponent has already joined this match")]
    AlreadyJoined,

    #[error("stake must equal the initiator's stake of {expected}")]
    StakeMismatch { expected: u64, provided: u64 },

    #[error("match is not ready — opponent has not joined")]
    NotReady,

    #[error("winner must be one of the two players")]
    InvalidWinner,

    #[error("match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
