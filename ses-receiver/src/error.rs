//! Error types for decoding, subscription confirmation and suppression sinks.

use thiserror::Error;

/// Errors raised while decoding an inbound notification body.
///
/// Both variants are caller-input errors: the request is rejected with a
/// client error before dispatch begins.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JSON Payload: {0}")]
    MalformedPayload(String),

    #[error("Key '{0}' not found in payload")]
    MissingTypeDiscriminator(&'static str),
}

/// Failures while confirming an SNS subscription.
///
/// These never escape dispatch; they are logged and the request still
/// succeeds.
#[derive(Debug, Error)]
pub enum ConfirmationError {
    #[error("HTTP Code {status}, {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("{0}")]
    Transport(String),

    #[error("Invalid SubscribeURL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failure reported by a suppression sink.
#[derive(Debug, Error)]
#[error("Suppression sink error: {0}")]
pub struct SinkError(#[from] pub anyhow::Error);
