//! The escrow engine: arbiter capability and the Match state machine.

pub mod arbiter;
pub mod escrow;
