//! Order notifications.

use crate::ids::{OrderId, StoreId, UserId};
use crate::ports::OrderNotifier;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Event name used on the realtime channel.
pub const ORDER_EVENT: &str = "notificationOrder";

/// Tells the store a buyer placed an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    pub object_id: OrderId,
    pub from: UserId,
    pub to: StoreId,
}

/// Forwards notifications to a channel drained by the realtime transport.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<OrderNotification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<OrderNotification>) -> Self {
        Self { tx }
    }

    /// A notifier and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OrderNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl OrderNotifier for ChannelNotifier {
    fn notify(&self, notification: OrderNotification) {
        if let Err(e) = self.tx.send(notification) {
            debug!(order = %e.0.object_id, "notification channel closed, dropping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let n = OrderNotification {
            object_id: OrderId::new("o1"),
            from: UserId::new("u1"),
            to: StoreId::new("s1"),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["objectId"], "o1");
        assert_eq!(json["from"], "u1");
        assert_eq!(json["to"], "s1");
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (notifier, rx) = ChannelNotifier::channel();
        drop(rx);
        notifier.notify(OrderNotification {
            object_id: OrderId::new("o1"),
            from: UserId::new("u1"),
            to: StoreId::new("s1"),
        });
    }
}
