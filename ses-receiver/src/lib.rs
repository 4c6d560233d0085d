//! SES receiver - turns Amazon SES bounce and complaint notifications into
//! address suppression events.
//!
//! ## Architecture
//!
//! ```text
//! SNS → /mailer/{transport}/callback → decode → Dispatcher → SuppressionSink
//!                                                    └→ SubscribeURL confirmation
//! ```

pub mod config;
pub mod confirm;
pub mod error;
pub mod notification;
pub mod sink;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use confirm::{ConfirmationClient, HttpResponse, ReqwestConfirmationClient};
pub use error::{ConfirmationError, DecodeError, SinkError};
pub use notification::{decode, Dispatcher, NotificationEnvelope, NotificationKind};
pub use sink::{
    MemorySuppressionSink, Publisher, SuppressionCategory, SuppressionEvent, SuppressionSink,
    TracingSuppressionSink,
};
pub use web::{router, AppState};
