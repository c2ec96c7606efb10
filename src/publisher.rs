//! Publishes domain events to NATS when configured; always logs them.

use crate::domain::events::DomainEvent;

const SUBJECT_PREFIX: &str = "storefront";

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::default() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable; events will only be logged");
                Self::default()
            }
        }
    }

    /// Delivery is best effort: a failed publish is logged and dropped.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = format!("{SUBJECT_PREFIX}.{}", event.subject());
            tracing::debug!(%subject, ?event, "domain event");
            let Some(client) = &self.nats else { continue };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(%subject, error = %e, "could not encode event");
                    continue;
                }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(%subject, error = %e, "event publish failed");
            }
        }
    }
}
