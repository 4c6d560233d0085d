//! Normalized suppression events emitted by the dispatcher.

use serde::{Deserialize, Serialize};

/// Default queue name for published suppression events.
pub const SUPPRESSION_QUEUE: &str = "email_suppressions";

/// Why an address must no longer receive mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionCategory {
    /// The recipient complained; treat as an unsubscribe.
    Unsubscribed,
    /// The address hard-bounced.
    Bounced,
}

impl SuppressionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsubscribed => "unsubscribed",
            Self::Bounced => "bounced",
        }
    }
}

/// Instruction to stop sending to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionEvent {
    /// Recipient email address
    pub address: String,
    /// Complaint reason key or bounce diagnostic
    pub reason: String,
    pub category: SuppressionCategory,
    /// Platform email id recovered from the `X-EMAIL-ID` header (bounces only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl SuppressionEvent {
    pub fn unsubscribed(address: String, reason: String) -> Self {
        Self {
            address,
            reason,
            category: SuppressionCategory::Unsubscribed,
            correlation_id: None,
        }
    }

    pub fn bounced(address: String, reason: String, correlation_id: Option<String>) -> Self {
        Self {
            address,
            reason,
            category: SuppressionCategory::Bounced,
            correlation_id,
        }
    }
}
