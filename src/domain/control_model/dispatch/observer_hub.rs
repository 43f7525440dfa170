use slotmap::{SlotMap, new_key_type};

use crate::domain::control_model::command_manager::control_mode::ControlMode;
use crate::domain::control_model::dispatch::update_dispatcher::UpdateDispatcher;
use crate::domain::control_model::node::node::Node;
use crate::domain::control_model::utils::id::NodeId;

new_key_type! {
    pub struct ObserverId;
}

/// Plain listener outside the core (HMI views, loggers, automation algorithms).
pub trait ControlObserver: std::fmt::Debug + Send {
    fn on_node_update(&mut self, _node: &Node) {}

    fn on_control_mode_changed(&mut self, _mode: ControlMode) {}
}

/// Fan-out of node and control mode changes to registered observers.
///
/// Mode changes go to every observer, node updates only to observers watching that node.
#[derive(Debug, Default)]
pub struct ObserverHub {
    observers: SlotMap<ObserverId, Box<dyn ControlObserver>>,
    node_watches: UpdateDispatcher<ObserverId>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self { observers: SlotMap::with_key(), node_watches: UpdateDispatcher::new() }
    }

    pub fn add_observer(&mut self, observer: Box<dyn ControlObserver>) -> ObserverId {
        self.observers.insert(observer)
    }

    /// Returns false if the observer is unknown.
    pub fn watch_node(&mut self, observer: ObserverId, node_id: NodeId) -> bool {
        if !self.observers.contains_key(observer) {
            return false;
        }
        self.node_watches.subscribe(node_id, observer);
        true
    }

    pub fn remove_observer(&mut self, observer: ObserverId) -> Option<Box<dyn ControlObserver>> {
        let removed = self.observers.remove(observer)?;
        self.node_watches.unsubscribe_matching(|payload| *payload == observer);
        Some(removed)
    }

    pub fn notify_node(&mut self, node: &Node) {
        for (_, observer_id) in self.node_watches.snapshot(&node.id) {
            if let Some(observer) = self.observers.get_mut(observer_id) {
                observer.on_node_update(node);
            }
        }
    }

    pub fn notify_mode(&mut self, mode: ControlMode) {
        for observer in self.observers.values_mut() {
            observer.on_control_mode_changed(mode);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
