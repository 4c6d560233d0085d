//! Async RabbitMQ publisher for suppression events.
//!
//! The publisher is shared by every request task. It connects lazily on the
//! first publish and reconnects when the channel drops.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::SuppressionEvent;
use super::SuppressionSink;
use crate::error::SinkError;

/// Async RabbitMQ publisher with connection management.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    queue: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl Publisher {
    /// Create a publisher for `queue` on the broker at `url`. No connection is
    /// opened until the first publish.
    pub fn new(url: String, queue: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                queue,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    pub fn queue(&self) -> &str {
        &self.inner.queue
    }

    async fn ensure_connected(&self) -> Result<Channel> {
        {
            let channel = self.inner.channel.read().await;
            if let Some(ch) = channel.as_ref() {
                if ch.status().connected() {
                    return Ok(ch.clone());
                }
            }
        }

        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Double-check after acquiring write lock
        if let Some(ch) = channel.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        info!("rabbitmq_publisher_connected");

        let ch = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        ch.queue_declare(
            &self.inner.queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare suppression queue")?;

        info!(queue = %self.inner.queue, "rabbitmq_queue_declared");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Publish one suppression event as persistent JSON.
    pub async fn publish_suppression(&self, event: &SuppressionEvent) -> Result<()> {
        let channel = self.ensure_connected().await?;

        let body = serde_json::to_vec(event).context("Failed to serialize suppression event")?;
        let message_id = message_id_for(event);

        let mut properties = BasicProperties::default()
            .with_delivery_mode(2) // Persistent
            .with_content_type("application/json".into());
        if let Some(id) = &message_id {
            properties = properties.with_message_id(id.clone().into());
        }

        channel
            .basic_publish(
                "",
                &self.inner.queue,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await
            .context("Failed to publish to suppression queue")?
            .await
            .context("Failed to confirm publish")?;

        info!(
            queue = %self.inner.queue,
            message_id = ?message_id,
            body_length = body.len(),
            "rabbitmq_suppression_published"
        );

        Ok(())
    }

    /// Close the connection gracefully.
    pub async fn close(&self) {
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

#[async_trait]
impl SuppressionSink for Publisher {
    async fn add_failure(&self, event: &SuppressionEvent) -> Result<(), SinkError> {
        self.publish_suppression(event).await.map_err(SinkError)
    }
}

/// Message id for a published event, only when a correlation id makes it
/// unique; the same address can bounce or complain more than once.
fn message_id_for(event: &SuppressionEvent) -> Option<String> {
    event.correlation_id.as_ref().map(|correlation_id| {
        format!(
            "{}-{}-{}",
            event.category.as_str(),
            correlation_id,
            event.address
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_creation() {
        let publisher = Publisher::new(
            "amqp://localhost:5672".to_string(),
            "email_suppressions".to_string(),
        );

        assert_eq!(publisher.queue(), "email_suppressions");
        assert!(Arc::strong_count(&publisher.inner) == 1);
    }

    #[test]
    fn test_message_id_for() {
        let event = SuppressionEvent::bounced(
            "gone@example.com".to_string(),
            "unknown".to_string(),
            Some("17".to_string()),
        );

        assert_eq!(
            message_id_for(&event).as_deref(),
            Some("bounced-17-gone@example.com")
        );
    }

    #[test]
    fn test_message_id_distinct_for_repeated_bounces() {
        let first = SuppressionEvent::bounced(
            "gone@example.com".to_string(),
            "unknown".to_string(),
            Some("17".to_string()),
        );
        let second = SuppressionEvent::bounced(
            "gone@example.com".to_string(),
            "unknown".to_string(),
            Some("18".to_string()),
        );

        assert_ne!(message_id_for(&first), message_id_for(&second));
    }

    #[test]
    fn test_message_id_unset_without_correlation_id() {
        let bounce = SuppressionEvent::bounced(
            "gone@example.com".to_string(),
            "unknown".to_string(),
            None,
        );
        let complaint = SuppressionEvent::unsubscribed(
            "gone@example.com".to_string(),
            "complaint.reason.abuse".to_string(),
        );

        assert_eq!(message_id_for(&bounce), None);
        assert_eq!(message_id_for(&complaint), None);
    }
}
