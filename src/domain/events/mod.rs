//! Domain events
//!
//! Published to NATS when a broker is configured; the service runs fine
//! without one. Publishing never fails the request that raised the event.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        total_amount: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        status: String,
    },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "storefront.order.created",
            Self::OrderStatusChanged { .. } => "storefront.order.status_changed",
        }
    }
}

pub async fn publish(nats: Option<&async_nats::Client>, event: &DomainEvent) {
    let Some(client) = nats else { return };
    let payload = match serde_json::to_vec(event) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode domain event");
            return;
        }
    };
    if let Err(e) = client
        .publish(event.subject().to_string(), payload.into())
        .await
    {
        tracing::warn!(error = %e, subject = event.subject(), "failed to publish domain event");
    }
}
