//! Payload decoding for SNS/SES notification bodies.
//!
//! SES delivers notifications in two shapes. Messages published through an
//! SNS topic arrive wrapped in an SNS envelope tagged by `Type`, while
//! configuration-set event destinations tag the body with `eventType`. The
//! `Message` of a wrapped `Notification` is itself a JSON document encoded as
//! a string, tagged by `notificationType`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DecodeError;

/// Discriminator key of the SNS envelope.
pub const TYPE_KEY: &str = "Type";

/// Discriminator key used by configuration-set event publishing.
pub const EVENT_TYPE_KEY: &str = "eventType";

/// Discriminator key of the SES message carried inside a `Notification`.
pub const NOTIFICATION_TYPE_KEY: &str = "notificationType";

/// Declared type of a notification envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    SubscriptionConfirmation,
    Notification,
    Complaint,
    Bounce,
    /// Any type this receiver does not act on (e.g. `Delivery`, `DeliveryDelay`).
    Other(String),
}

impl NotificationKind {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "SubscriptionConfirmation" => Self::SubscriptionConfirmation,
            "Notification" => Self::Notification,
            "Complaint" => Self::Complaint,
            "Bounce" => Self::Bounce,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SubscriptionConfirmation => "SubscriptionConfirmation",
            Self::Notification => "Notification",
            Self::Complaint => "Complaint",
            Self::Bounce => "Bounce",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded notification: its resolved kind plus the untyped JSON object.
///
/// Only [`decode`] and [`decode_nested`] construct envelopes, so `kind` is
/// always derived from a discriminator present in `raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEnvelope {
    kind: NotificationKind,
    raw: Value,
}

impl NotificationEnvelope {
    pub fn kind(&self) -> &NotificationKind {
        &self.kind
    }

    /// The full decoded JSON object.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Deserialize the per-kind view of this envelope.
    ///
    /// Nested fields are only validated here, so a malformed complaint still
    /// decodes as a `Complaint` envelope and can be logged.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.raw)
    }
}

/// Decode a raw request body into a top-level envelope.
///
/// The kind is taken from `Type` when present, else from `eventType`.
pub fn decode(body: &[u8]) -> Result<NotificationEnvelope, DecodeError> {
    let raw: Value =
        serde_json::from_slice(body).map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let kind = resolve_kind(&raw, &[TYPE_KEY, EVENT_TYPE_KEY])
        .ok_or(DecodeError::MissingTypeDiscriminator(TYPE_KEY))?;

    Ok(NotificationEnvelope { kind, raw })
}

/// Decode the string-encoded `Message` of an SNS `Notification`.
///
/// The inner document always uses `notificationType` as its discriminator.
pub fn decode_nested(message: &str) -> Result<NotificationEnvelope, DecodeError> {
    let raw: Value = serde_json::from_str(message)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let kind = resolve_kind(&raw, &[NOTIFICATION_TYPE_KEY])
        .ok_or(DecodeError::MissingTypeDiscriminator(NOTIFICATION_TYPE_KEY))?;

    Ok(NotificationEnvelope { kind, raw })
}

/// Resolve the kind from the first key that is present with a non-null value.
///
/// Returns `None` for non-object documents, which carry no discriminator.
fn resolve_kind(raw: &Value, keys: &[&str]) -> Option<NotificationKind> {
    let object = raw.as_object()?;

    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
        .map(|value| match value {
            Value::String(tag) => NotificationKind::parse(tag),
            other => NotificationKind::Other(other.to_string()),
        })
}
