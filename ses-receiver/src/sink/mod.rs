//! Suppression sinks: where normalized suppression events are delivered.
//!
//! Persistence of suppression records lives outside this crate. A sink either
//! logs the decision, publishes it to RabbitMQ for the platform to consume,
//! or collects it in memory.
//!
//! ```text
//! Dispatcher → SuppressionSink → email_suppressions queue → platform
//! ```

pub mod publisher;
pub mod types;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::SinkError;

pub use publisher::Publisher;
pub use types::{SuppressionCategory, SuppressionEvent, SUPPRESSION_QUEUE};

/// Receives suppression decisions.
///
/// Implementations are shared across concurrent requests and must be safe to
/// call from several tasks at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SuppressionSink: Send + Sync {
    async fn add_failure(&self, event: &SuppressionEvent) -> Result<(), SinkError>;
}

/// Sink that only records decisions in the structured log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSuppressionSink;

#[async_trait]
impl SuppressionSink for TracingSuppressionSink {
    async fn add_failure(&self, event: &SuppressionEvent) -> Result<(), SinkError> {
        info!(
            address = %event.address,
            reason = %event.reason,
            category = event.category.as_str(),
            correlation_id = ?event.correlation_id,
            "suppression_recorded"
        );
        Ok(())
    }
}

/// Sink that keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct MemorySuppressionSink {
    events: Mutex<Vec<SuppressionEvent>>,
}

impl MemorySuppressionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events received so far.
    pub async fn events(&self) -> Vec<SuppressionEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl SuppressionSink for MemorySuppressionSink {
    async fn add_failure(&self, event: &SuppressionEvent) -> Result<(), SinkError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_memory_sink_preserves_order() {
        let sink = MemorySuppressionSink::new();

        for address in ["a@example.com", "b@example.com", "c@example.com"] {
            sink.add_failure(&SuppressionEvent::unsubscribed(
                address.to_string(),
                "complaint.reason.unknown".to_string(),
            ))
            .await
            .unwrap();
        }

        let addresses: Vec<String> = sink.events().await.into_iter().map(|e| e.address).collect();
        assert_eq!(addresses, vec!["a@example.com", "b@example.com", "c@example.com"]);
    }

    #[tokio::test]
    async fn test_memory_sink_concurrent_writers() {
        let sink = Arc::new(MemorySuppressionSink::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    sink.add_failure(&SuppressionEvent::bounced(
                        format!("user{}@example.com", i),
                        "unknown".to_string(),
                        None,
                    ))
                    .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(sink.events().await.len(), 16);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_events() {
        let sink = TracingSuppressionSink;

        let result = sink
            .add_failure(&SuppressionEvent::bounced(
                "x@example.com".to_string(),
                "unknown".to_string(),
                Some("7".to_string()),
            ))
            .await;

        assert!(result.is_ok());
    }
}
