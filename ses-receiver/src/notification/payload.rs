//! Typed views over the per-kind structure of a notification.
//!
//! Field names follow the SES notification contents:
//! https://docs.aws.amazon.com/ses/latest/dg/notification-contents.html

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Header carrying the platform's email identifier on outgoing mail.
pub const EMAIL_ID_HEADER: &str = "X-EMAIL-ID";

/// Diagnostic used when a bounced recipient carries no `diagnosticCode`.
pub const UNKNOWN_BOUNCE_REASON: &str = "unknown";

/// SNS subscription handshake.
#[derive(Debug, Deserialize)]
pub struct SubscriptionConfirmation {
    #[serde(rename = "SubscribeURL")]
    pub subscribe_url: String,
    #[serde(default, rename = "TopicArn")]
    pub topic_arn: Option<String>,
}

/// SNS notification whose `Message` is a JSON document encoded as a string.
#[derive(Debug, Deserialize)]
pub struct WrappedNotification {
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(default, rename = "MessageId")]
    pub message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComplaintNotification {
    pub complaint: Complaint,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    complained_recipients: Vec<Value>,
    /// Non-string values are treated as absent.
    #[serde(default, deserialize_with = "lenient_string")]
    pub complaint_feedback_type: Option<String>,
}

impl Complaint {
    /// Well-formed recipients in input order; malformed entries are skipped.
    pub fn recipients(&self) -> Vec<ComplainedRecipient> {
        parse_entries(&self.complained_recipients, "complaint_recipient_skipped")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplainedRecipient {
    pub email_address: String,
}

#[derive(Debug, Deserialize)]
pub struct BounceNotification {
    pub bounce: Bounce,
    #[serde(default)]
    pub mail: Option<Mail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounce {
    pub bounce_type: String,
    bounced_recipients: Vec<Value>,
}

impl Bounce {
    /// Only hard bounces suppress; transient and undetermined ones are ignored.
    pub fn is_permanent(&self) -> bool {
        self.bounce_type == "Permanent"
    }

    /// Well-formed recipients in input order; malformed entries are skipped.
    pub fn recipients(&self) -> Vec<BouncedRecipient> {
        parse_entries(&self.bounced_recipients, "bounce_recipient_skipped")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BouncedRecipient {
    pub email_address: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub diagnostic_code: Option<String>,
}

impl BouncedRecipient {
    pub fn reason(&self) -> &str {
        self.diagnostic_code
            .as_deref()
            .unwrap_or(UNKNOWN_BOUNCE_REASON)
    }
}

/// The `mail` object, kept untyped; only its headers are ever read.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct Mail(Value);

impl Mail {
    /// Value of the last `X-EMAIL-ID` header, if any.
    ///
    /// Headers with another name are never inspected, so a malformed
    /// unrelated header cannot hide the id.
    pub fn email_id(&self) -> Option<&str> {
        self.0
            .get("headers")?
            .as_array()?
            .iter()
            .rev()
            .find(|header| header.get("name").and_then(Value::as_str) == Some(EMAIL_ID_HEADER))?
            .get("value")?
            .as_str()
    }
}

/// Deserialize each entry on its own, logging and dropping the ones that fail.
fn parse_entries<T: DeserializeOwned>(entries: &[Value], event: &'static str) -> Vec<T> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match T::deserialize(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(index = index, error = %e, entry = %entry, "{}", event);
                None
            }
        })
        .collect()
}

/// Accept any JSON value, keeping it only when it is a string.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Normalized complaint reason, resolved from `complaintFeedbackType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintReason {
    Abuse,
    Fraud,
    Virus,
    Unknown,
}

impl ComplaintReason {
    pub fn from_feedback_type(feedback_type: Option<&str>) -> Self {
        match feedback_type {
            Some("abuse") => Self::Abuse,
            Some("fraud") => Self::Fraud,
            Some("virus") => Self::Virus,
            _ => Self::Unknown,
        }
    }

    /// Translation key handed to the suppression sink.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Abuse => "complaint.reason.abuse",
            Self::Fraud => "complaint.reason.fraud",
            Self::Virus => "complaint.reason.virus",
            Self::Unknown => "complaint.reason.unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complaint_reason_mapping() {
        assert_eq!(
            ComplaintReason::from_feedback_type(Some("abuse")).key(),
            "complaint.reason.abuse"
        );
        assert_eq!(
            ComplaintReason::from_feedback_type(Some("fraud")).key(),
            "complaint.reason.fraud"
        );
        assert_eq!(
            ComplaintReason::from_feedback_type(Some("virus")).key(),
            "complaint.reason.virus"
        );
        assert_eq!(
            ComplaintReason::from_feedback_type(Some("not-spam")).key(),
            "complaint.reason.unknown"
        );
        assert_eq!(
            ComplaintReason::from_feedback_type(None),
            ComplaintReason::Unknown
        );
    }

    #[test]
    fn test_email_id_last_header_wins() {
        let mail: Mail = serde_json::from_str(
            r#"{"headers": [
                {"name": "X-EMAIL-ID", "value": "A"},
                {"name": "Subject", "value": "Hello"},
                {"name": "X-EMAIL-ID", "value": "B"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(mail.email_id(), Some("B"));
    }

    #[test]
    fn test_email_id_is_case_sensitive() {
        let mail: Mail =
            serde_json::from_str(r#"{"headers": [{"name": "x-email-id", "value": "A"}]}"#)
                .unwrap();

        assert_eq!(mail.email_id(), None);
    }

    #[test]
    fn test_email_id_without_headers() {
        let mail: Mail = serde_json::from_str(r#"{"messageId": "abc"}"#).unwrap();

        assert_eq!(mail.email_id(), None);
    }

    #[test]
    fn test_bounced_recipient_reason() {
        let with_code: BouncedRecipient = serde_json::from_str(
            r#"{"emailAddress": "a@example.com", "diagnosticCode": "smtp; 550 5.1.1 user unknown"}"#,
        )
        .unwrap();
        let without_code: BouncedRecipient =
            serde_json::from_str(r#"{"emailAddress": "b@example.com"}"#).unwrap();

        assert_eq!(with_code.reason(), "smtp; 550 5.1.1 user unknown");
        assert_eq!(without_code.reason(), "unknown");
    }

    #[test]
    fn test_bounce_is_permanent() {
        let bounce: Bounce =
            serde_json::from_str(r#"{"bounceType": "Transient", "bouncedRecipients": []}"#)
                .unwrap();

        assert!(!bounce.is_permanent());
    }

    #[test]
    fn test_email_id_ignores_malformed_unrelated_headers() {
        let mail: Mail = serde_json::from_str(
            r#"{"headers": [
                {"name": "Received"},
                {"value": 12},
                "junk",
                {"name": "X-EMAIL-ID", "value": "A"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(mail.email_id(), Some("A"));
    }

    #[test]
    fn test_bounce_recipients_skip_malformed_entries() {
        let bounce: Bounce = serde_json::from_str(
            r#"{"bounceType": "Permanent", "bouncedRecipients": [
                {"emailAddress": "a@example.com", "diagnosticCode": 550},
                {"emailAddress": null},
                {"emailAddress": "b@example.com"}
            ]}"#,
        )
        .unwrap();

        let recipients = bounce.recipients();
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].email_address, "a@example.com");
        assert_eq!(recipients[0].reason(), "unknown");
        assert_eq!(recipients[1].email_address, "b@example.com");
    }

    #[test]
    fn test_non_string_feedback_type_is_absent() {
        let complaint: Complaint = serde_json::from_str(
            r#"{"complainedRecipients": [{"emailAddress": "a@example.com"}], "complaintFeedbackType": 7}"#,
        )
        .unwrap();

        assert_eq!(complaint.complaint_feedback_type, None);
        assert_eq!(complaint.recipients().len(), 1);
    }
}
