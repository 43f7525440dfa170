#![allow(dead_code)]

use std::sync::Arc;

use field_control_plane::domain::clock::clock_mock::MockClock;
use field_control_plane::domain::control_model::command_manager::control_mode::ControlMode;
use field_control_plane::domain::control_model::command_manager::transmitter::{ElementDispatch, TransmitOutcome};
use field_control_plane::domain::control_model::control_plane::ControlPlane;
use field_control_plane::domain::control_model::device::loopback_transmitter::{LoopbackTransmitter, simulated_value};
use field_control_plane::domain::control_model::node::node::{ControlClass, Node, NodeValue};
use field_control_plane::domain::control_model::node::node_registry::NodeRegistry;
use field_control_plane::domain::control_model::utils::id::NodeId;

pub struct Field {
    pub plane: ControlPlane,
    pub transmitter: LoopbackTransmitter,
    pub clock: Arc<MockClock>,
}

pub fn node(id: &str, control_class: ControlClass, value: impl Into<NodeValue>) -> Node {
    Node::new(NodeId::new(id), control_class, Some(value.into()))
}

/// Small irrigation network: two valves, a pump, a gate and two level sensors.
pub fn field(mode: ControlMode) -> Field {
    let registry = NodeRegistry::from_nodes(vec![
        node("V_001", ControlClass::Valve, "Open"),
        node("V_002", ControlClass::Valve, "Close"),
        node("P_001", ControlClass::Pump, "Off"),
        node("G_001", ControlClass::Gate, "Close"),
        node("G_002", ControlClass::Gate, 0.0),
        node("L_001", ControlClass::Sensor, 1.0),
        node("L_002", ControlClass::Sensor, 2.0),
    ])
    .unwrap();

    let transmitter = LoopbackTransmitter::new();
    let clock = Arc::new(MockClock::new(0));
    let plane = ControlPlane::new(registry, Box::new(transmitter.clone()), clock.clone(), mode);

    Field { plane, transmitter, clock }
}

impl Field {
    /// Acknowledges every queued dispatch as delivered without changing node values.
    pub fn acknowledge_all(&mut self) -> Vec<ElementDispatch> {
        let dispatches = self.transmitter.drain();
        for dispatch in &dispatches {
            self.plane.on_transmit_result(&dispatch.command_uuid, TransmitOutcome::Delivered);
        }
        dispatches
    }

    /// Acknowledges every queued dispatch and reports the value the device would reach.
    pub fn execute_all(&mut self) -> Vec<ElementDispatch> {
        let dispatches = self.transmitter.drain();
        for dispatch in &dispatches {
            let value = self.plane.registry().get_node(&dispatch.node_id).and_then(|node| simulated_value(node, dispatch));
            self.plane.on_transmit_result(&dispatch.command_uuid, TransmitOutcome::Delivered);
            if let Some(value) = value {
                self.plane.on_node_update(&dispatch.node_id, value).unwrap();
            }
        }
        dispatches
    }

    pub fn update(&mut self, node_id: &str, value: impl Into<NodeValue>) {
        self.plane.on_node_update(&NodeId::new(node_id), value.into()).unwrap();
    }
}
