//! Web server module for receiving SES notifications over SNS HTTP(S)
//! subscriptions.

pub mod auth;
pub mod handlers;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use auth::{is_token_verification_enabled, is_transport_allowed, verify_callback_token};
pub use handlers::{health, mailer_callback, AppState, CallbackQuery, HealthResponse, CALLBACK_ACK};

/// Build the application router.
///
/// SNS posts notifications, but the callback also answers GET so the endpoint
/// can be exercised from a browser.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/mailer/:transport/callback",
            get(mailer_callback).post(mailer_callback),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
