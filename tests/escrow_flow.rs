//! End-to-end escrow scenarios against the public engine API.
//!
//! These walk full match lifecycles and check fund conservation from the
//! ledger's point of view: every terminal path must leave balances exactly
//! accounted for, with no match left addressable.

use std::sync::Arc;

use arena::engine::arbiter::ArbiterCap;
use arena::engine::escrow::EscrowEngine;
use arena::events::{EscrowEvent, Journal, JournalSink};
use arena::ledger::{InMemoryLedger, Ledger};
use arena::types::{AccountId, EscrowError};

struct World {
    ledger: Arc<InMemoryLedger>,
    journal: Arc<Journal>,
    engine: EscrowEngine,
    cap: ArbiterCap,
    alice: AccountId,
    bob: AccountId,
    admin: AccountId,
}

impl World {
    fn new() -> Self {
        let alice = AccountId::new("0xalice");
        let bob = AccountId::new("0xbob");
        let admin = AccountId::new("0xadmin");

        let ledger = Arc::new(InMemoryLedger::seeded([
            (alice.clone(), 2000),
            (bob.clone(), 2000),
        ]));
        let journal = Arc::new(Journal::new());
        let cap = ArbiterCap::issue();
        let engine = EscrowEngine::new(
            ledger.clone(),
            Arc::new(JournalSink::new(journal.clone())),
            &cap,
        );

        World { ledger, journal, engine, cap, alice, bob, admin }
    }
}

#[test]
fn settled_match_moves_the_whole_pot_to_the_winner() {
    let w = World::new();

    // open(A, B, 500) → join(B, 500) → settle(admin, A)
    let stake = w.ledger.withdraw(&w.alice, 500).unwrap();
    let id = w.engine.open(&w.alice, &w.bob, &w.admin, stake).unwrap();

    let stake = w.ledger.withdraw(&w.bob, 500).unwrap();
    w.engine.join(id, &w.bob, stake).unwrap();

    let total = w.engine.settle(id, &w.alice, &w.cap).unwrap();
    assert_eq!(total, 1000);

    // A is up exactly 500 net, B down exactly 500; nothing minted or burnt.
    assert_eq!(w.ledger.balance(&w.alice), 2500);
    assert_eq!(w.ledger.balance(&w.bob), 1500);
    assert_eq!(w.ledger.total_supply(), 4000);

    // The match is gone.
    assert!(!w.engine.contains(id));
    assert_eq!(w.engine.details(id).unwrap_err(), EscrowError::MatchNotFound(id));
}

#[test]
fn cancelled_match_leaves_the_initiator_whole() {
    let w = World::new();

    let stake = w.ledger.withdraw(&w.alice, 500).unwrap();
    let id = w.engine.open(&w.alice, &w.bob, &w.admin, stake).unwrap();
    assert_eq!(w.ledger.balance(&w.alice), 1500);

    w.engine.cancel(id, &w.alice).unwrap();

    assert_eq!(w.ledger.balance(&w.alice), 2000);
    assert_eq!(w.ledger.balance(&w.bob), 2000);
    assert!(!w.engine.contains(id));
}

#[test]
fn every_rejection_leaves_state_untouched() {
    let w = World::new();

    let stake = w.ledger.withdraw(&w.alice, 500).unwrap();
    let id = w.engine.open(&w.alice, &w.bob, &w.admin, stake).unwrap();

    // Wrong caller, wrong amount, premature settle: all bounce, and the
    // custody objects come back.
    let stake = w.ledger.withdraw(&w.bob, 500).unwrap();
    let rejected = w.engine.join(id, &w.admin, stake).unwrap_err();
    assert_eq!(rejected.error, EscrowError::NotAuthorized);
    w.ledger.deposit(rejected.stake, &w.bob);

    let stake = w.ledger.withdraw(&w.bob, 300).unwrap();
    let rejected = w.engine.join(id, &w.bob, stake).unwrap_err();
    assert_eq!(rejected.error, EscrowError::StakeMismatch { expected: 500, provided: 300 });
    w.ledger.deposit(rejected.stake, &w.bob);

    assert_eq!(w.engine.settle(id, &w.alice, &w.cap).unwrap_err(), EscrowError::NotReady);

    // Bob ends exactly where he started; match still open.
    assert_eq!(w.ledger.balance(&w.bob), 2000);
    let details = w.engine.details(id).unwrap();
    assert!(!details.ready);
    assert_eq!(details.stake_amount, 500);

    // Only the open event was ever emitted.
    let events = w.journal.snapshot();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0].event, EscrowEvent::MatchOpened { .. }));
}

#[test]
fn ready_match_can_only_settle() {
    let w = World::new();

    let stake = w.ledger.withdraw(&w.alice, 400).unwrap();
    let id = w.engine.open(&w.alice, &w.bob, &w.admin, stake).unwrap();
    let stake = w.ledger.withdraw(&w.bob, 400).unwrap();
    w.engine.join(id, &w.bob, stake).unwrap();

    assert_eq!(w.engine.cancel(id, &w.alice).unwrap_err(), EscrowError::AlreadyJoined);
    assert_eq!(w.engine.cancel_as_arbiter(id, &w.cap).unwrap_err(), EscrowError::AlreadyJoined);

    // An outsider can't be named winner, a forged capability can't settle.
    assert_eq!(
        w.engine.settle(id, &w.admin, &w.cap).unwrap_err(),
        EscrowError::InvalidWinner
    );
    let forged = ArbiterCap::issue();
    assert_eq!(
        w.engine.settle(id, &w.bob, &forged).unwrap_err(),
        EscrowError::NotAuthorized
    );

    // The genuine settle still works after all those rejections.
    let total = w.engine.settle(id, &w.bob, &w.cap).unwrap();
    assert_eq!(total, 800);
    assert_eq!(w.ledger.balance(&w.bob), 2400);
}

#[test]
fn independent_matches_do_not_interfere() {
    let w = World::new();

    let stake = w.ledger.withdraw(&w.alice, 100).unwrap();
    let first = w.engine.open(&w.alice, &w.bob, &w.admin, stake).unwrap();
    let stake = w.ledger.withdraw(&w.alice, 200).unwrap();
    let second = w.engine.open(&w.alice, &w.bob, &w.admin, stake).unwrap();

    let stake = w.ledger.withdraw(&w.bob, 200).unwrap();
    w.engine.join(second, &w.bob, stake).unwrap();

    // Settling the second match leaves the first open and untouched.
    w.engine.settle(second, &w.bob, &w.cap).unwrap();
    assert!(w.engine.contains(first));
    assert!(!w.engine.details(first).unwrap().ready);

    w.engine.cancel(first, &w.alice).unwrap();
    assert_eq!(w.ledger.total_supply(), 4000);
    assert_eq!(w.ledger.balance(&w.alice), 1800);
    assert_eq!(w.ledger.balance(&w.bob), 2200);
}

#[test]
fn journal_records_the_full_history() {
    let w = World::new();

    let stake = w.ledger.withdraw(&w.alice, 500).unwrap();
    let settled = w.engine.open(&w.alice, &w.bob, &w.admin, stake).unwrap();
    let stake = w.ledger.withdraw(&w.bob, 500).unwrap();
    w.engine.join(settled, &w.bob, stake).unwrap();
    w.engine.settle(settled, &w.alice, &w.cap).unwrap();

    let stake = w.ledger.withdraw(&w.alice, 250).unwrap();
    let cancelled = w.engine.open(&w.alice, &w.bob, &w.admin, stake).unwrap();
    w.engine.cancel(cancelled, &w.alice).unwrap();

    let events: Vec<_> = w.journal.snapshot().into_iter().map(|r| r.event).collect();
    assert_eq!(events.len(), 5);
    assert_eq!(events[2], EscrowEvent::MatchSettled {
        id: settled,
        winner: w.alice.clone(),
        total_amount: 1000,
    });
    assert_eq!(events[4], EscrowEvent::MatchCancelled {
        id: cancelled,
        refunded_to: w.alice.clone(),
    });
}
