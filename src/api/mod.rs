//! HTTP API — Axum surface over the escrow engine.
//!
//! A thin translation layer: JSON in, engine call, JSON out.
//! CORS enabled for local development.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// Start the API web server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_api(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "API server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind API port");

        axum::serve(listener, app)
            .await
            .expect("API server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static(routes::ARBITER_SECRET_HEADER),
        ]);

    Router::new()
        .route("/api/matches", post(routes::open_match).get(routes::list_matches))
        .route("/api/matches/:id", get(routes::get_match))
        .route("/api/matches/:id/join", post(routes::join_match))
        .route("/api/matches/:id/settle", post(routes::settle_match))
        .route("/api/matches/:id/cancel", post(routes::cancel_match))
        .route("/api/accounts/:address/balance", get(routes::get_balance))
        .route("/api/events", get(routes::get_events))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
