use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::domain::control_model::command::command_types::ControlType;
use crate::domain::control_model::command_manager::transmitter::{DeviceTransmitter, ElementDispatch};
use crate::domain::control_model::node::node::{Node, NodeValue};

/// In-process device layer: dispatches are queued and later drained by whoever plays the
/// field devices (the CLI loop or a test).
///
/// Clones share the same queue, so one clone can be handed to the control plane while another
/// one drains.
#[derive(Debug, Clone, Default)]
pub struct LoopbackTransmitter {
    queue: Arc<Mutex<VecDeque<ElementDispatch>>>,
}

impl LoopbackTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every queued dispatch, most urgent priority first. Dispatches of equal priority keep
    /// their transmit order.
    pub fn drain(&self) -> Vec<ElementDispatch> {
        let mut dispatches: Vec<ElementDispatch> = match self.queue.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        dispatches.sort_by_key(|dispatch| dispatch.priority);
        dispatches
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }
}

impl DeviceTransmitter for LoopbackTransmitter {
    fn transmit(&self, dispatch: ElementDispatch) {
        log::debug!("Loopback transmit {} -> {} ({:?}).", dispatch.owner, dispatch.node_id, dispatch.control_type);
        match self.queue.lock() {
            Ok(mut queue) => queue.push_back(dispatch),
            Err(poisoned) => poisoned.into_inner().push_back(dispatch),
        }
    }
}

/// Value a healthy device reports after executing `dispatch`.
///
/// Switch commands report the control-class label, SET reports the set value. Measurements and
/// sensors change nothing.
pub fn simulated_value(node: &Node, dispatch: &ElementDispatch) -> Option<NodeValue> {
    match dispatch.control_type {
        ControlType::Measure => None,
        ControlType::Set => dispatch.set_value.clone(),
        ControlType::True | ControlType::False => {
            node.control_class.label_for(dispatch.control_type).map(NodeValue::from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::control_model::command::command_types::WrapCommandRef;
    use crate::domain::control_model::node::node::ControlClass;
    use crate::domain::control_model::utils::id::{CommandUuid, NodeId};

    fn dispatch(node: &str, control_type: ControlType, priority: u8) -> ElementDispatch {
        ElementDispatch {
            owner: WrapCommandRef::control("cmd"),
            node_id: NodeId::new(node),
            command_uuid: CommandUuid::random(),
            control_type,
            set_value: None,
            priority,
        }
    }

    #[test]
    fn test_drain_orders_by_priority() {
        let transmitter = LoopbackTransmitter::new();
        let shared = transmitter.clone();

        transmitter.transmit(dispatch("P_001", ControlType::True, 2));
        transmitter.transmit(dispatch("V_001", ControlType::False, 0));
        transmitter.transmit(dispatch("V_002", ControlType::True, 2));

        let order: Vec<String> = shared.drain().into_iter().map(|d| d.node_id.to_string()).collect();
        assert_eq!(order, vec!["V_001", "P_001", "V_002"]);
        assert_eq!(transmitter.pending(), 0);
    }

    #[test]
    fn test_simulated_value_uses_labels() {
        let pump = Node::new(NodeId::new("P_001"), ControlClass::Pump, None);
        assert_eq!(simulated_value(&pump, &dispatch("P_001", ControlType::True, 2)), Some(NodeValue::from("On")));
        assert_eq!(simulated_value(&pump, &dispatch("P_001", ControlType::Measure, 3)), None);
    }
}
