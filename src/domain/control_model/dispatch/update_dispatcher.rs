use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;

use crate::domain::control_model::utils::id::NodeId;

new_key_type! {
    /// Identity handed out by [`UpdateDispatcher::subscribe`]. Removal goes through this id only.
    pub struct SubscriptionId;
}

#[derive(Debug)]
struct Subscription<T> {
    node_id: NodeId,
    payload: T,
}

/// Per-node fan-out list of "node value changed" subscribers.
///
/// Delivery is driven by the owner: it takes a [`snapshot`](UpdateDispatcher::snapshot) of the
/// subscribers of a node and works through it. Subscriptions removed while the snapshot is being
/// processed stay in the snapshot, so owners check [`is_subscribed`](UpdateDispatcher::is_subscribed)
/// or look their payload up again before acting on it.
#[derive(Debug)]
pub struct UpdateDispatcher<T> {
    subscriptions: SlotMap<SubscriptionId, Subscription<T>>,

    /// Subscription order per node.
    by_node: HashMap<NodeId, Vec<SubscriptionId>>,
}

impl<T: Clone> UpdateDispatcher<T> {
    pub fn new() -> Self {
        Self { subscriptions: SlotMap::with_key(), by_node: HashMap::new() }
    }

    pub fn subscribe(&mut self, node_id: NodeId, payload: T) -> SubscriptionId {
        let id = self.subscriptions.insert(Subscription { node_id: node_id.clone(), payload });
        self.by_node.entry(node_id).or_default().push(id);
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(subscription) = self.subscriptions.remove(id) else {
            return false;
        };

        if let Some(ids) = self.by_node.get_mut(&subscription.node_id) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_node.remove(&subscription.node_id);
            }
        }
        true
    }

    /// Removes every subscription whose payload matches. Returns how many were removed.
    pub fn unsubscribe_matching(&mut self, mut matches: impl FnMut(&T) -> bool) -> usize {
        let ids: Vec<SubscriptionId> =
            self.subscriptions.iter().filter(|(_, subscription)| matches(&subscription.payload)).map(|(id, _)| id).collect();

        let mut removed = 0;
        for id in ids {
            if self.unsubscribe(id) {
                removed += 1;
            }
        }
        removed
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions.contains_key(id)
    }

    /// Subscribers of `node_id` in subscription order, copied out of the dispatcher.
    pub fn snapshot(&self, node_id: &NodeId) -> Vec<(SubscriptionId, T)> {
        self.by_node
            .get(node_id)
            .map(|ids| ids.iter().filter_map(|id| self.subscriptions.get(*id).map(|subscription| (*id, subscription.payload.clone()))).collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, node_id: &NodeId) -> usize {
        self.by_node.get(node_id).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl<T: Clone> Default for UpdateDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_keeps_subscription_order() {
        let mut dispatcher = UpdateDispatcher::new();
        let node = NodeId::new("L_001");

        dispatcher.subscribe(node.clone(), "first");
        dispatcher.subscribe(NodeId::new("L_002"), "other");
        dispatcher.subscribe(node.clone(), "second");

        let payloads: Vec<&str> = dispatcher.snapshot(&node).into_iter().map(|(_, payload)| payload).collect();
        assert_eq!(payloads, vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe_while_working_through_snapshot() {
        let mut dispatcher = UpdateDispatcher::new();
        let node = NodeId::new("L_001");
        let first = dispatcher.subscribe(node.clone(), 1);
        let second = dispatcher.subscribe(node.clone(), 2);

        let mut delivered = Vec::new();
        for (id, payload) in dispatcher.snapshot(&node) {
            if !dispatcher.is_subscribed(id) {
                continue;
            }
            delivered.push(payload);
            // The first subscriber tears down both subscriptions from inside its own callback.
            dispatcher.unsubscribe(first);
            dispatcher.unsubscribe(second);
        }

        assert_eq!(delivered, vec![1]);
        assert_eq!(dispatcher.subscriber_count(&node), 0);
        assert!(!dispatcher.unsubscribe(first));
    }
}
