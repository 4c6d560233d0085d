//! Webhook endpoint handlers.
//!
//! The callback handler decodes the body, dispatches it and always answers
//! `200 success` once decoding succeeds. Dispatch problems are logged rather
//! than surfaced, so SNS never enters its retry/backoff cycle because of them.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::notification::{decode, Dispatcher};
use crate::web::auth::{is_token_verification_enabled, is_transport_allowed, verify_callback_token};
use crate::Config;

/// Body returned for every accepted callback.
pub const CALLBACK_ACK: &str = "success";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Mailer Transport Callback
// =============================================================================

/// Query string of the callback URL.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// SES/SNS callback endpoint, mounted at `/mailer/{transport}/callback`.
///
/// This endpoint:
/// 1. Checks the transport allowlist and callback token (if configured)
/// 2. Decodes the body, rejecting malformed or untyped payloads with 400
/// 3. Dispatches the envelope and acknowledges with 200
pub async fn mailer_callback(
    State(state): State<AppState>,
    Path(transport): Path<String>,
    Query(query): Query<CallbackQuery>,
    body: Bytes,
) -> (StatusCode, String) {
    debug!(
        transport = %transport,
        body_length = body.len(),
        "sns_webhook_received"
    );

    if !is_transport_allowed(state.config.allowed_transports.as_deref(), &transport) {
        warn!(transport = %transport, "callback_transport_not_allowed");
        return (StatusCode::NOT_FOUND, "unknown transport".to_string());
    }

    if let Some(expected) = state
        .config
        .callback_token
        .as_deref()
        .filter(|_| is_token_verification_enabled(&state.config.callback_token))
    {
        if !verify_callback_token(expected, query.token.as_deref()) {
            return (StatusCode::UNAUTHORIZED, "unauthorized".to_string());
        }
    }

    let envelope = match decode(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(transport = %transport, error = %e, "sns_webhook_rejected");
            return (StatusCode::BAD_REQUEST, format!("AmazonCallback: {}", e));
        }
    };

    let kind = envelope.kind().clone();
    let events = state.dispatcher.dispatch(envelope).await;

    info!(
        transport = %transport,
        kind = %kind,
        suppressions = events.len(),
        "sns_webhook_processed"
    );

    (StatusCode::OK, CALLBACK_ACK.to_string())
}
