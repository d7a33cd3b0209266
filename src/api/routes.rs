//! API route handlers.
//!
//! All endpoints return JSON. Handlers only translate requests into engine
//! calls — every precondition lives in the engine, none here. The one thing
//! this layer does own is presenting the arbiter capability: settle (and
//! arbiter cancel) require the shared secret header, which unlocks the
//! process's `ArbiterCap`.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::arbiter::ArbiterCap;
use crate::engine::escrow::EscrowEngine;
use crate::events::{Journal, RecordedEvent};
use crate::ledger::{InMemoryLedger, Ledger};
use crate::types::{AccountId, EscrowError, MatchDetails, MatchId};

/// Header carrying the arbiter shared secret.
pub const ARBITER_SECRET_HEADER: &str = "x-arbiter-secret";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Holds the arbiter capability behind a shared secret. The capability
/// never leaves this struct; handlers borrow it per-request after the
/// secret check.
pub struct ArbiterGate {
    cap: ArbiterCap,
    secret: SecretString,
    pub address: AccountId,
}

impl ArbiterGate {
    pub fn new(cap: ArbiterCap, secret: SecretString, address: AccountId) -> Self {
        ArbiterGate { cap, secret, address }
    }

    /// Present the capability iff the request carried the right secret.
    fn authorize(&self, headers: &HeaderMap) -> Option<&ArbiterCap> {
        let presented = headers.get(ARBITER_SECRET_HEADER)?.to_str().ok()?;
        if presented == self.secret.expose_secret().as_str() {
            Some(&self.cap)
        } else {
            None
        }
    }
}

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub engine: Arc<EscrowEngine>,
    pub ledger: Arc<InMemoryLedger>,
    pub journal: Arc<Journal>,
    pub arbiter: ArbiterGate,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OpenMatchRequest {
    pub initiator: String,
    pub opponent: String,
    pub stake_amount: u64,
}

#[derive(Debug, Serialize)]
pub struct OpenMatchResponse {
    pub match_id: MatchId,
    pub initiator: String,
    pub opponent: String,
    pub stake_amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct JoinMatchRequest {
    pub caller: String,
    pub stake_amount: u64,
}

#[derive(Debug, Serialize)]
pub struct JoinMatchResponse {
    pub match_id: MatchId,
    pub opponent: String,
    pub ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct SettleMatchRequest {
    pub winner: String,
}

#[derive(Debug, Serialize)]
pub struct SettleMatchResponse {
    pub match_id: MatchId,
    pub winner: String,
    pub total_amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct CancelMatchRequest {
    /// The account asking for the refund. Omitted when cancelling with the
    /// arbiter secret header.
    pub caller: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelMatchResponse {
    pub match_id: MatchId,
    pub refunded_to: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: u64,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Translates engine rejections into HTTP responses with a JSON error body.
#[derive(Debug)]
pub enum ApiError {
    Escrow(EscrowError),
    InvalidMatchId(String),
}

impl From<EscrowError> for ApiError {
    fn from(e: EscrowError) -> Self {
        ApiError::Escrow(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Escrow(EscrowError::MatchNotFound(_)) => {
                (StatusCode::NOT_FOUND, self.message())
            }
            ApiError::Escrow(EscrowError::NotAuthorized) => {
                (StatusCode::UNAUTHORIZED, self.message())
            }
            _ => (StatusCode::BAD_REQUEST, self.message()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl ApiError {
    fn message(&self) -> String {
        match self {
            ApiError::Escrow(e) => e.to_string(),
            ApiError::InvalidMatchId(s) => format!("invalid match id: {s}"),
        }
    }
}

fn parse_match_id(raw: &str) -> Result<MatchId, ApiError> {
    MatchId::parse(raw).ok_or_else(|| ApiError::InvalidMatchId(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/matches
pub async fn open_match(
    State(state): State<AppState>,
    Json(req): Json<OpenMatchRequest>,
) -> Result<Json<OpenMatchResponse>, ApiError> {
    let initiator = AccountId::new(req.initiator.clone());
    let opponent = AccountId::new(req.opponent.clone());

    let stake = state.ledger.withdraw(&initiator, req.stake_amount)?;
    match state.engine.open(&initiator, &opponent, &state.arbiter.address, stake) {
        Ok(match_id) => Ok(Json(OpenMatchResponse {
            match_id,
            initiator: req.initiator,
            opponent: req.opponent,
            stake_amount: req.stake_amount,
        })),
        Err(rejected) => {
            // Engine rejected the whole operation — make the caller whole.
            state.ledger.deposit(rejected.stake, &initiator);
            Err(rejected.error.into())
        }
    }
}

/// POST /api/matches/:id/join
pub async fn join_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<JoinMatchRequest>,
) -> Result<Json<JoinMatchResponse>, ApiError> {
    let id = parse_match_id(&id)?;
    let caller = AccountId::new(req.caller.clone());

    let stake = state.ledger.withdraw(&caller, req.stake_amount)?;
    match state.engine.join(id, &caller, stake) {
        Ok(()) => Ok(Json(JoinMatchResponse { match_id: id, opponent: req.caller, ready: true })),
        Err(rejected) => {
            state.ledger.deposit(rejected.stake, &caller);
            Err(rejected.error.into())
        }
    }
}

/// POST /api/matches/:id/settle
pub async fn settle_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SettleMatchRequest>,
) -> Result<Json<SettleMatchResponse>, ApiError> {
    let id = parse_match_id(&id)?;
    let cap = state
        .arbiter
        .authorize(&headers)
        .ok_or(ApiError::Escrow(EscrowError::NotAuthorized))?;

    let winner = AccountId::new(req.winner.clone());
    let total_amount = state.engine.settle(id, &winner, cap)?;
    Ok(Json(SettleMatchResponse { match_id: id, winner: req.winner, total_amount }))
}

/// POST /api/matches/:id/cancel
pub async fn cancel_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CancelMatchRequest>,
) -> Result<Json<CancelMatchResponse>, ApiError> {
    let id = parse_match_id(&id)?;

    // Look up the refund target before the match is destroyed.
    let details = state.engine.details(id)?;

    if let Some(cap) = state.arbiter.authorize(&headers) {
        state.engine.cancel_as_arbiter(id, cap)?;
    } else if let Some(caller) = req.caller {
        state.engine.cancel(id, &AccountId::new(caller))?;
    } else {
        return Err(EscrowError::NotAuthorized.into());
    }

    Ok(Json(CancelMatchResponse {
        match_id: id,
        refunded_to: details.initiator.to_string(),
    }))
}

/// GET /api/matches/:id
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MatchDetails>, ApiError> {
    let id = parse_match_id(&id)?;
    Ok(Json(state.engine.details(id)?))
}

/// GET /api/matches
pub async fn list_matches(State(state): State<AppState>) -> Json<Vec<MatchDetails>> {
    Json(state.engine.list())
}

/// GET /api/accounts/:address/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<BalanceResponse> {
    let account = AccountId::new(address.clone());
    Json(BalanceResponse { address, balance: state.ledger.balance(&account) })
}

/// GET /api/events
pub async fn get_events(State(state): State<AppState>) -> Json<Vec<RecordedEvent>> {
    Json(state.journal.snapshot())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
