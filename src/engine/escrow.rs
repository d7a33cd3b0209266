//! The Match state machine and its keyed store.
//!
//! One `EscrowEngine` holds every live Match behind a single mutex. Each
//! operation takes the lock for the whole check-and-mutate, so concurrent
//! calls against the same Match are serialized: at most one `join` ever
//! observes the empty opponent slot, and a settle/cancel race leaves one
//! caller with `MatchNotFound`. Fund movement happens under the same lock
//! as the state change, which is what makes every operation all-or-nothing
//! for external observers.
//!
//! Terminal transitions (settle, cancel) remove the Match from the store.
//! The emitted event is the only durable record of the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::engine::arbiter::{ArbiterCap, CapId};
use crate::events::{EscrowEvent, EventSink};
use crate::ledger::{Ledger, Rejected, Stake};
use crate::types::{AccountId, EscrowError, MatchDetails, MatchId};

// ---------------------------------------------------------------------------
// Match record
// ---------------------------------------------------------------------------

/// A live Match. Owns the custodied stakes exclusively: nothing outside the
/// engine can touch them until a terminal transition releases them.
struct MatchRecord {
    initiator: AccountId,
    opponent: AccountId,
    arbiter: AccountId,
    initiator_stake: Stake,
    /// Present iff the opponent has joined (`ready == true`).
    opponent_stake: Option<Stake>,
}

impl MatchRecord {
    fn ready(&self) -> bool {
        self.opponent_stake.is_some()
    }

    fn details(&self, id: MatchId) -> MatchDetails {
        MatchDetails {
            id,
            initiator: self.initiator.clone(),
            opponent: self.opponent.clone(),
            stake_amount: self.initiator_stake.value(),
            ready: self.ready(),
            arbiter: self.arbiter.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Keyed store of Match state machines.
pub struct EscrowEngine {
    matches: Mutex<HashMap<MatchId, MatchRecord>>,
    ledger: Arc<dyn Ledger>,
    events: Arc<dyn EventSink>,
    /// Identity of the one capability honored by `settle` and arbiter
    /// `cancel`. Registered at construction, never changed.
    arbiter_cap: CapId,
}

impl EscrowEngine {
    /// Build an engine that honors `cap` as its settlement authority.
    pub fn new(ledger: Arc<dyn Ledger>, events: Arc<dyn EventSink>, cap: &ArbiterCap) -> Self {
        EscrowEngine {
            matches: Mutex::new(HashMap::new()),
            ledger,
            events,
            arbiter_cap: cap.id(),
        }
    }

    /// Open a new Match. The initiator's stake moves into custody; the
    /// returned id makes the Match addressable by the opponent.
    ///
    /// Rejections hand the stake back: `SelfMatchNotAllowed` if the
    /// initiator names themself as opponent, `InvalidStakeAmount` for a
    /// zero-value stake.
    pub fn open(
        &self,
        initiator: &AccountId,
        opponent: &AccountId,
        arbiter: &AccountId,
        stake: Stake,
    ) -> Result<MatchId, Rejected> {
        if initiator == opponent {
            return Err(Rejected { error: EscrowError::SelfMatchNotAllowed, stake });
        }
        if stake.value() == 0 {
            return Err(Rejected { error: EscrowError::InvalidStakeAmount, stake });
        }

        let id = MatchId::generate();
        let stake_amount = stake.value();
        let record = MatchRecord {
            initiator: initiator.clone(),
            opponent: opponent.clone(),
            arbiter: arbiter.clone(),
            initiator_stake: stake,
            opponent_stake: None,
        };

        let mut matches = self.lock();
        matches.insert(id, record);

        // Emitted under the lock so journal order matches commit order.
        self.events.emit(&EscrowEvent::MatchOpened {
            id,
            initiator: initiator.clone(),
            opponent: opponent.clone(),
            stake_amount,
        });
        Ok(id)
    }

    /// Deposit the opponent's stake, making the Match ready.
    ///
    /// Only the named opponent may join, exactly once, with a stake equal
    /// to the initiator's. A second join always fails `AlreadyJoined`, no
    /// matter who calls — the occupied slot is checked before the caller.
    pub fn join(&self, id: MatchId, caller: &AccountId, stake: Stake) -> Result<(), Rejected> {
        let mut matches = self.lock();
        let Some(record) = matches.get_mut(&id) else {
            return Err(Rejected { error: EscrowError::MatchNotFound(id), stake });
        };
        if record.ready() {
            return Err(Rejected { error: EscrowError::AlreadyJoined, stake });
        }
        if caller != &record.opponent {
            return Err(Rejected { error: EscrowError::NotAuthorized, stake });
        }
        let expected = record.initiator_stake.value();
        if stake.value() != expected {
            let provided = stake.value();
            return Err(Rejected {
                error: EscrowError::StakeMismatch { expected, provided },
                stake,
            });
        }

        record.opponent_stake = Some(stake);

        self.events.emit(&EscrowEvent::MatchJoined { id, opponent: caller.clone() });
        Ok(())
    }

    /// Settle a ready Match: the whole pot moves to `winner` and the Match
    /// is destroyed. Returns the total amount transferred.
    ///
    /// Requires the capability this engine was built with. The winner must
    /// be one of the two players — the engine does not compute winners, it
    /// trusts the arbiter's designation.
    pub fn settle(
        &self,
        id: MatchId,
        winner: &AccountId,
        cap: &ArbiterCap,
    ) -> Result<u64, EscrowError> {
        if cap.id() != self.arbiter_cap {
            return Err(EscrowError::NotAuthorized);
        }

        let mut matches = self.lock();
        let record = matches.get(&id).ok_or(EscrowError::MatchNotFound(id))?;
        if !record.ready() {
            return Err(EscrowError::NotReady);
        }
        if winner != &record.initiator && winner != &record.opponent {
            return Err(EscrowError::InvalidWinner);
        }

        // All preconditions hold: take the Match out and release the pot.
        let record = matches.remove(&id).expect("present under lock");
        let opponent_stake = record.opponent_stake.expect("ready implies joined");
        let pot = record.initiator_stake.merge(opponent_stake);
        let total_amount = pot.value();
        self.ledger.deposit(pot, winner);

        self.events.emit(&EscrowEvent::MatchSettled {
            id,
            winner: winner.clone(),
            total_amount,
        });
        Ok(total_amount)
    }

    /// Cancel an Open match as its initiator: the stake is refunded and
    /// the Match destroyed. A ready Match cannot be cancelled — it must be
    /// settled — so that path fails `AlreadyJoined` before any identity
    /// check.
    pub fn cancel(&self, id: MatchId, caller: &AccountId) -> Result<(), EscrowError> {
        let mut matches = self.lock();
        let record = matches.get(&id).ok_or(EscrowError::MatchNotFound(id))?;
        if record.ready() {
            return Err(EscrowError::AlreadyJoined);
        }
        if caller != &record.initiator {
            return Err(EscrowError::NotAuthorized);
        }
        self.refund_open_match(&mut matches, id)
    }

    /// Cancel an Open match with the arbiter capability. The refund still
    /// goes to the initiator.
    pub fn cancel_as_arbiter(&self, id: MatchId, cap: &ArbiterCap) -> Result<(), EscrowError> {
        if cap.id() != self.arbiter_cap {
            return Err(EscrowError::NotAuthorized);
        }
        let mut matches = self.lock();
        let record = matches.get(&id).ok_or(EscrowError::MatchNotFound(id))?;
        if record.ready() {
            return Err(EscrowError::AlreadyJoined);
        }
        self.refund_open_match(&mut matches, id)
    }

    /// Shared terminal path for cancel: preconditions already checked.
    fn refund_open_match(
        &self,
        matches: &mut HashMap<MatchId, MatchRecord>,
        id: MatchId,
    ) -> Result<(), EscrowError> {
        let record = matches.remove(&id).expect("present under lock");
        let refunded_to = record.initiator.clone();
        self.ledger.deposit(record.initiator_stake, &refunded_to);

        self.events.emit(&EscrowEvent::MatchCancelled { id, refunded_to });
        Ok(())
    }

    /// Snapshot of one Match.
    pub fn details(&self, id: MatchId) -> Result<MatchDetails, EscrowError> {
        let matches = self.lock();
        matches
            .get(&id)
            .map(|record| record.details(id))
            .ok_or(EscrowError::MatchNotFound(id))
    }

    /// Snapshots of every live Match.
    pub fn list(&self) -> Vec<MatchDetails> {
        let matches = self.lock();
        matches.iter().map(|(id, record)| record.details(*id)).collect()
    }

    /// Whether a Match is still addressable.
    pub fn contains(&self, id: MatchId) -> bool {
        self.lock().contains_key(&id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MatchId, MatchRecord>> {
        self.matches.lock().expect("escrow lock poisoned")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
