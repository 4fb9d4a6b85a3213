// service/notification_service.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use num_traits::ToPrimitive;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::gigmodel::{Bid, Gig, HireOutcome};

/// Payload pushed to a freelancer when one of their bids is accepted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HireEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "bidId")]
    pub bid_id: Uuid,
    #[serde(rename = "gigId")]
    pub gig_id: Uuid,
    #[serde(rename = "freelancerId")]
    pub freelancer_id: Uuid,
    pub price: f64,
    #[serde(rename = "gigTitle")]
    pub gig_title: String,
    #[serde(rename = "hiredAt")]
    pub hired_at: DateTime<Utc>,
}

impl HireEvent {
    /// The price is the bid's stored price; nothing is recomputed at hire time.
    pub fn new(bid: &Bid, gig: &Gig) -> Self {
        Self {
            kind: "hired",
            bid_id: bid.id,
            gig_id: gig.id,
            freelancer_id: bid.freelancer_id,
            price: bid.price.to_f64().unwrap_or(0.0),
            gig_title: gig.title.clone(),
            hired_at: Utc::now(),
        }
    }

    pub fn from_outcome(outcome: &HireOutcome) -> Self {
        Self::new(&outcome.hired_bid, &outcome.gig)
    }
}

/// Hands a hire event to whoever may be listening. Implementations must not
/// block and must never surface an error to the hire caller.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, event: HireEvent);
}

pub type ConnectionId = u64;

/// Push-mode registry of live connections keyed by user id.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    next_id: AtomicU64,
    connections: RwLock<HashMap<Uuid, HashMap<ConnectionId, mpsc::UnboundedSender<HireEvent>>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_connection(
        &self,
        user_id: Uuid,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<HireEvent>) {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        connections.entry(user_id).or_default().insert(connection_id, tx);

        tracing::debug!("🔌 Connection {} registered for user {}", connection_id, user_id);
        (connection_id, rx)
    }

    pub fn unregister_connection(&self, user_id: Uuid, connection_id: ConnectionId) {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(user_connections) = connections.get_mut(&user_id) {
            user_connections.remove(&connection_id);
            if user_connections.is_empty() {
                connections.remove(&user_id);
            }
        }

        tracing::debug!("🔌 Connection {} unregistered for user {}", connection_id, user_id);
    }

    /// Sends `event` to every live connection of `user_id` and returns how many
    /// received it. Connections whose receiver is gone are pruned.
    pub fn emit(&self, user_id: Uuid, event: &HireEvent) -> usize {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(user_connections) = connections.get_mut(&user_id) else {
            return 0;
        };

        user_connections.retain(|_, tx| tx.send(event.clone()).is_ok());
        let delivered = user_connections.len();
        if user_connections.is_empty() {
            connections.remove(&user_id);
        }

        delivered
    }

    pub fn connection_count(&self, user_id: Uuid) -> usize {
        self.connections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&user_id)
            .map_or(0, HashMap::len)
    }
}

impl NotificationDispatcher for ConnectionHub {
    fn dispatch(&self, event: HireEvent) {
        let delivered = self.emit(event.freelancer_id, &event);

        if delivered == 0 {
            tracing::info!(
                "Freelancer {} is offline; hire of bid {} will be seen on next read",
                event.freelancer_id,
                event.bid_id
            );
        } else {
            tracing::info!(
                "Hire notification for bid {} delivered to {} connection(s)",
                event.bid_id,
                delivered
            );
        }
    }
}

/// Poll-mode dispatcher: clients discover hires by reading their bids.
#[derive(Debug, Default)]
pub struct DiscardDispatcher;

impl NotificationDispatcher for DiscardDispatcher {
    fn dispatch(&self, event: HireEvent) {
        tracing::debug!(
            "Poll mode: hire of bid {} left for freelancer {} to discover",
            event.bid_id,
            event.freelancer_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_for(freelancer_id: Uuid) -> HireEvent {
        HireEvent {
            kind: "hired",
            bid_id: Uuid::new_v4(),
            gig_id: Uuid::new_v4(),
            freelancer_id,
            price: 100.0,
            gig_title: "Landing page".to_string(),
            hired_at: Utc::now(),
        }
    }

    #[test]
    fn test_emit_reaches_every_connection_of_user() {
        let hub = ConnectionHub::new();
        let user = Uuid::new_v4();
        let (_, mut rx1) = hub.register_connection(user);
        let (_, mut rx2) = hub.register_connection(user);
        let (_, mut other) = hub.register_connection(Uuid::new_v4());

        let event = event_for(user);
        assert_eq!(hub.emit(user, &event), 2);

        assert_eq!(rx1.try_recv().unwrap(), event);
        assert_eq!(rx2.try_recv().unwrap(), event);
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_emit_without_connection_is_discarded() {
        let hub = ConnectionHub::new();
        let user = Uuid::new_v4();
        assert_eq!(hub.emit(user, &event_for(user)), 0);

        // dispatch must swallow the miss
        hub.dispatch(event_for(user));
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let hub = ConnectionHub::new();
        let user = Uuid::new_v4();
        let (id, mut rx) = hub.register_connection(user);

        hub.unregister_connection(user, id);

        assert_eq!(hub.connection_count(user), 0);
        assert_eq!(hub.emit(user, &event_for(user)), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receivers_are_pruned() {
        let hub = ConnectionHub::new();
        let user = Uuid::new_v4();
        let (_, rx) = hub.register_connection(user);
        let (_, mut live) = hub.register_connection(user);
        drop(rx);

        assert_eq!(hub.emit(user, &event_for(user)), 1);
        assert_eq!(hub.connection_count(user), 1);
        assert!(live.try_recv().is_ok());
    }

    #[test]
    fn test_event_serializes_with_client_field_names() {
        let event = event_for(Uuid::nil());
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "hired");
        assert_eq!(value["price"], 100.0);
        assert!(value.get("bidId").is_some());
        assert!(value.get("gigTitle").is_some());
    }
}
