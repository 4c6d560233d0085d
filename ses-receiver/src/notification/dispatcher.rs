//! Notification dispatch: routes a decoded envelope to per-kind handling.
//!
//! ```text
//! SubscriptionConfirmation → GET SubscribeURL
//! Notification             → decode Message, dispatch inner envelope
//! Complaint                → one Unsubscribed event per complained recipient
//! Bounce (Permanent)       → one Bounced event per bounced recipient
//! anything else            → warning only
//! ```
//!
//! Dispatch never fails: every problem past decoding is logged and the
//! request is still acknowledged, so SNS does not start redelivering.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::envelope::{decode_nested, NotificationEnvelope, NotificationKind};
use super::payload::{
    BounceNotification, ComplaintNotification, ComplaintReason, SubscriptionConfirmation,
    WrappedNotification,
};
use crate::confirm::{confirm_subscription, ConfirmationClient};
use crate::sink::{SuppressionEvent, SuppressionSink};

/// Default bound on how many `Notification` layers are unwrapped.
pub const DEFAULT_MAX_UNWRAP_DEPTH: usize = 8;

/// Routes envelopes and forwards the resulting events to a suppression sink.
///
/// Holds no per-request state; one instance is shared by all request tasks.
pub struct Dispatcher {
    client: Arc<dyn ConfirmationClient>,
    sink: Arc<dyn SuppressionSink>,
    max_unwrap_depth: usize,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn ConfirmationClient>, sink: Arc<dyn SuppressionSink>) -> Self {
        Self {
            client,
            sink,
            max_unwrap_depth: DEFAULT_MAX_UNWRAP_DEPTH,
        }
    }

    pub fn with_max_unwrap_depth(mut self, depth: usize) -> Self {
        self.max_unwrap_depth = depth;
        self
    }

    /// Dispatch one envelope.
    ///
    /// Returns the emitted suppression events in recipient order. Each event
    /// has already been handed to the sink when this returns.
    pub async fn dispatch(&self, envelope: NotificationEnvelope) -> Vec<SuppressionEvent> {
        let events = self.classify(envelope).await;

        for event in &events {
            if let Err(e) = self.sink.add_failure(event).await {
                error!(
                    address = %event.address,
                    category = event.category.as_str(),
                    error = %e,
                    "suppression_sink_failed"
                );
            }
        }

        events
    }

    /// Unwrap nested notifications, then handle the innermost envelope.
    async fn classify(&self, envelope: NotificationEnvelope) -> Vec<SuppressionEvent> {
        let mut envelope = envelope;
        let mut depth = 0;

        loop {
            let inner = match envelope.kind() {
                NotificationKind::Notification => {
                    if depth >= self.max_unwrap_depth {
                        error!(
                            depth = depth,
                            max_depth = self.max_unwrap_depth,
                            "sns_notification_too_deep"
                        );
                        return Vec::new();
                    }
                    match unwrap_notification(&envelope) {
                        Some(inner) => inner,
                        None => return Vec::new(),
                    }
                }
                NotificationKind::SubscriptionConfirmation => {
                    self.confirm(&envelope).await;
                    return Vec::new();
                }
                NotificationKind::Complaint => return complaint_events(&envelope),
                NotificationKind::Bounce => return bounce_events(&envelope),
                NotificationKind::Other(kind) => {
                    warn!(kind = %kind, "sns_webhook_type_not_understood");
                    debug!(payload = %envelope.raw(), "sns_webhook_payload");
                    return Vec::new();
                }
            };

            envelope = inner;
            depth += 1;
        }
    }

    async fn confirm(&self, envelope: &NotificationEnvelope) {
        let confirmation: SubscriptionConfirmation = match envelope.payload() {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "subscription_confirmation_invalid");
                return;
            }
        };

        match confirm_subscription(self.client.as_ref(), &confirmation.subscribe_url).await {
            Ok(()) => info!(
                topic_arn = ?confirmation.topic_arn,
                "subscription_confirmed"
            ),
            Err(e) => error!(
                topic_arn = ?confirmation.topic_arn,
                reason = %e,
                "subscription_confirmation_failed"
            ),
        }
    }
}

/// Decode the string-encoded `Message` of a `Notification` envelope.
fn unwrap_notification(envelope: &NotificationEnvelope) -> Option<NotificationEnvelope> {
    let wrapped: WrappedNotification = match envelope.payload() {
        Ok(w) => w,
        Err(e) => {
            warn!(error = %e, "sns_notification_message_missing");
            return None;
        }
    };

    match decode_nested(&wrapped.message) {
        Ok(inner) => {
            debug!(
                message_id = ?wrapped.message_id,
                inner_kind = %inner.kind(),
                "sns_notification_unwrapped"
            );
            Some(inner)
        }
        Err(e) => {
            warn!(
                message_id = ?wrapped.message_id,
                error = %e,
                "sns_notification_message_invalid"
            );
            None
        }
    }
}

/// One `Unsubscribed` event per complained recipient, all with the same reason.
pub fn complaint_events(envelope: &NotificationEnvelope) -> Vec<SuppressionEvent> {
    let notification: ComplaintNotification = match envelope.payload() {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "complaint_payload_invalid");
            return Vec::new();
        }
    };

    let complaint = notification.complaint;
    let reason =
        ComplaintReason::from_feedback_type(complaint.complaint_feedback_type.as_deref());

    complaint
        .recipients()
        .into_iter()
        .map(|recipient| {
            debug!(
                address = %recipient.email_address,
                reason = reason.key(),
                "complaint_unsubscribe"
            );
            SuppressionEvent::unsubscribed(recipient.email_address, reason.key().to_string())
        })
        .collect()
}

/// One `Bounced` event per recipient of a permanent bounce.
///
/// The correlation id comes from the last `X-EMAIL-ID` mail header.
pub fn bounce_events(envelope: &NotificationEnvelope) -> Vec<SuppressionEvent> {
    let notification: BounceNotification = match envelope.payload() {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "bounce_payload_invalid");
            return Vec::new();
        }
    };

    if !notification.bounce.is_permanent() {
        debug!(
            bounce_type = %notification.bounce.bounce_type,
            "bounce_not_permanent"
        );
        return Vec::new();
    }

    let email_id = notification
        .mail
        .as_ref()
        .and_then(|mail| mail.email_id())
        .map(str::to_string);

    notification
        .bounce
        .recipients()
        .into_iter()
        .map(|recipient| {
            debug!(
                address = %recipient.email_address,
                reason = recipient.reason(),
                email_id = ?email_id,
                "bounce_mark_bounced"
            );
            let reason = recipient.reason().to_string();
            SuppressionEvent::bounced(recipient.email_address, reason, email_id.clone())
        })
        .collect()
}
