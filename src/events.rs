//! Escrow lifecycle events and sinks.
//!
//! The engine announces every state transition to an `EventSink`.
//! Delivery is fire-and-forget: sinks cannot fail the operation that
//! produced the event. The journal sink keeps the audit trail that
//! outlives settled and cancelled matches (the Match object itself is
//! destroyed at settlement, so events are the only durable record).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::types::{AccountId, MatchId};

// ---------------------------------------------------------------------------
// Event model
// ---------------------------------------------------------------------------

/// One escrow state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EscrowEvent {
    MatchOpened {
        id: MatchId,
        initiator: AccountId,
        opponent: AccountId,
        stake_amount: u64,
    },
    MatchJoined {
        id: MatchId,
        opponent: AccountId,
    },
    MatchSettled {
        id: MatchId,
        winner: AccountId,
        total_amount: u64,
    },
    MatchCancelled {
        id: MatchId,
        refunded_to: AccountId,
    },
}

impl EscrowEvent {
    /// The match this event concerns.
    pub fn match_id(&self) -> MatchId {
        match self {
            EscrowEvent::MatchOpened { id, .. }
            | EscrowEvent::MatchJoined { id, .. }
            | EscrowEvent::MatchSettled { id, .. }
            | EscrowEvent::MatchCancelled { id, .. } => *id,
        }
    }
}

/// A journaled event with its emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: EscrowEvent,
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Observer of escrow events. Implementations must not block or fail —
/// the engine does not retry or await acknowledgement.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &EscrowEvent);
}

/// Emits each event as a structured log line.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &EscrowEvent) {
        match event {
            EscrowEvent::MatchOpened { id, initiator, opponent, stake_amount } => {
                info!(%id, %initiator, %opponent, stake_amount, "Match opened");
            }
            EscrowEvent::MatchJoined { id, opponent } => {
                info!(%id, %opponent, "Match joined");
            }
            EscrowEvent::MatchSettled { id, winner, total_amount } => {
                info!(%id, %winner, total_amount, "Match settled");
            }
            EscrowEvent::MatchCancelled { id, refunded_to } => {
                info!(%id, %refunded_to, "Match cancelled");
            }
        }
    }
}

/// The shared in-memory event journal.
pub struct Journal {
    entries: Mutex<Vec<RecordedEvent>>,
}

impl Journal {
    pub fn new() -> Self {
        Journal { entries: Mutex::new(Vec::new()) }
    }

    pub fn append(&self, event: EscrowEvent) {
        let mut entries = self.entries.lock().expect("journal lock poisoned");
        entries.push(RecordedEvent { at: Utc::now(), event });
    }

    /// Snapshot of all recorded events, oldest first.
    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        self.entries.lock().expect("journal lock poisoned").clone()
    }

    /// Replace the journal contents (used when restoring from disk).
    pub fn restore(&self, entries: Vec<RecordedEvent>) {
        *self.entries.lock().expect("journal lock poisoned") = entries;
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("journal lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends every event to a shared `Journal`.
pub struct JournalSink {
    journal: Arc<Journal>,
}

impl JournalSink {
    pub fn new(journal: Arc<Journal>) -> Self {
        JournalSink { journal }
    }
}

impl EventSink for JournalSink {
    fn emit(&self, event: &EscrowEvent) {
        self.journal.append(event.clone());
    }
}

/// Forwards each event to every inner sink, in order.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        FanoutSink { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &EscrowEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
