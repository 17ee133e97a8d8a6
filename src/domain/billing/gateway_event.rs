//! Inbound gateway webhook event types.
//!
//! Defines the structures for parsing gateway notification payloads.
//! An event is only a pointer ("something changed, go check"); the
//! authoritative state always comes from `fetch_payment_detail`.

use serde::{Deserialize, Serialize};

/// Gateway webhook event body.
///
/// Wire shape: `{id: int, action: string, data: {id: string}, type: string}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEvent {
    /// Gateway-assigned notification id; the idempotency ledger key.
    pub id: i64,

    /// Action within the resource type (e.g., "payment.updated").
    pub action: String,

    /// Reference to the affected gateway resource.
    pub data: GatewayEventData,

    /// Resource type (e.g., "payment", "subscription").
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Resource pointer carried by the event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEventData {
    /// Gateway id of the affected resource (a payment or subscription).
    pub id: String,
}

/// Routing for gateway events, decoded once at the boundary.
///
/// Closed set: anything outside the four handled pairs is `Unhandled`
/// and is ledger-recorded without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEventKind {
    PaymentCreated,
    PaymentUpdated,
    SubscriptionCreated,
    SubscriptionUpdated,
    /// Recognized delivery, unrecognized `{type, action}` pair.
    Unhandled,
}

impl GatewayEventKind {
    /// Decodes a `{type, action}` pair.
    pub fn from_type_and_action(event_type: &str, action: &str) -> Self {
        match (event_type, action) {
            ("payment", "payment.created") => Self::PaymentCreated,
            ("payment", "payment.updated") => Self::PaymentUpdated,
            ("subscription", "subscription.created") => Self::SubscriptionCreated,
            ("subscription", "subscription.updated") => Self::SubscriptionUpdated,
            _ => Self::Unhandled,
        }
    }
}

impl GatewayEvent {
    /// Ledger key: the gateway's integer id as a string.
    pub fn event_id(&self) -> String {
        self.id.to_string()
    }

    /// Decodes the routing kind for this event.
    pub fn kind(&self) -> GatewayEventKind {
        GatewayEventKind::from_type_and_action(&self.event_type, &self.action)
    }

    /// Gateway id of the resource this event points at.
    pub fn resource_id(&self) -> &str {
        &self.data.id
    }
}

/// Test helper for building gateway events.
#[cfg(test)]
pub struct GatewayEventBuilder {
    id: i64,
    action: String,
    event_type: String,
    resource_id: String,
}

#[cfg(test)]
impl GatewayEventBuilder {
    pub fn payment_updated(resource_id: impl Into<String>) -> Self {
        Self {
            id: 1,
            action: "payment.updated".to_string(),
            event_type: "payment".to_string(),
            resource_id: resource_id.into(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn build(self) -> GatewayEvent {
        GatewayEvent {
            id: self.id,
            action: self.action,
            data: GatewayEventData {
                id: self.resource_id,
            },
            event_type: self.event_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_shape() {
        let json = r#"{
            "id": 12345,
            "action": "payment.updated",
            "data": {"id": "987654321"},
            "type": "payment"
        }"#;

        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id, 12345);
        assert_eq!(event.event_id(), "12345");
        assert_eq!(event.resource_id(), "987654321");
        assert_eq!(event.kind(), GatewayEventKind::PaymentUpdated);
    }

    #[test]
    fn decodes_all_handled_pairs() {
        assert_eq!(
            GatewayEventKind::from_type_and_action("payment", "payment.created"),
            GatewayEventKind::PaymentCreated
        );
        assert_eq!(
            GatewayEventKind::from_type_and_action("payment", "payment.updated"),
            GatewayEventKind::PaymentUpdated
        );
        assert_eq!(
            GatewayEventKind::from_type_and_action("subscription", "subscription.created"),
            GatewayEventKind::SubscriptionCreated
        );
        assert_eq!(
            GatewayEventKind::from_type_and_action("subscription", "subscription.updated"),
            GatewayEventKind::SubscriptionUpdated
        );
    }

    #[test]
    fn unknown_pairs_decode_as_unhandled() {
        assert_eq!(
            GatewayEventKind::from_type_and_action("plan", "plan.updated"),
            GatewayEventKind::Unhandled
        );
        assert_eq!(
            GatewayEventKind::from_type_and_action("payment", "payment.deleted"),
            GatewayEventKind::Unhandled
        );
        // Mismatched pair: the type gates the action namespace.
        assert_eq!(
            GatewayEventKind::from_type_and_action("subscription", "payment.updated"),
            GatewayEventKind::Unhandled
        );
    }

    #[test]
    fn builder_produces_payment_updated() {
        let event = GatewayEventBuilder::payment_updated("555").with_id(99).build();
        assert_eq!(event.event_id(), "99");
        assert_eq!(event.kind(), GatewayEventKind::PaymentUpdated);
        assert_eq!(event.resource_id(), "555");
    }
}
