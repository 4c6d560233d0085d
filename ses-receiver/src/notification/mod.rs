//! SES notification decoding and dispatch.
//!
//! ## Processing Flow
//!
//! ```text
//! request body → decode() → NotificationEnvelope → Dispatcher::dispatch() → SuppressionEvents
//! ```

pub mod dispatcher;
pub mod envelope;
pub mod payload;

pub use dispatcher::{bounce_events, complaint_events, Dispatcher, DEFAULT_MAX_UNWRAP_DEPTH};
pub use envelope::{decode, decode_nested, NotificationEnvelope, NotificationKind};
pub use payload::ComplaintReason;
