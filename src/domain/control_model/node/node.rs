use std::fmt;

use crate::domain::control_model::command::command_types::ControlType;
use crate::domain::control_model::utils::id::NodeId;

/// A sensor or actuator reading. Devices report either numbers (levels, flows, pressures)
/// or text states ("Open", "Off", ...).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Number(f64),
    Text(String),
}

impl NodeValue {
    /// Loose equality used for "is the node already there" checks.
    /// Text compares case-insensitively, numbers compare exactly, mixed types never match.
    pub fn matches(&self, other: &NodeValue) -> bool {
        match (self, other) {
            (NodeValue::Number(a), NodeValue::Number(b)) => a == b,
            (NodeValue::Text(a), NodeValue::Text(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }

    pub fn matches_label(&self, label: &str) -> bool {
        match self {
            NodeValue::Text(text) => text.eq_ignore_ascii_case(label),
            NodeValue::Number(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            NodeValue::Number(value) => Some(*value),
            NodeValue::Text(_) => None,
        }
    }
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeValue::Number(value) => write!(f, "{}", value),
            NodeValue::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<f64> for NodeValue {
    fn from(value: f64) -> Self {
        NodeValue::Number(value)
    }
}

impl From<&str> for NodeValue {
    fn from(value: &str) -> Self {
        NodeValue::Text(value.to_string())
    }
}

/// Device class of a node. Decides what TRUE and FALSE mean on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlClass {
    Valve,
    Gate,
    Pump,
    Sensor,
}

impl ControlClass {
    /// Human readable state a device reports once it reached the given control type.
    /// Sensors and value-carrying control types have no label.
    pub fn label_for(&self, control_type: ControlType) -> Option<&'static str> {
        match (self, control_type) {
            (ControlClass::Valve | ControlClass::Gate, ControlType::True) => Some("Open"),
            (ControlClass::Valve | ControlClass::Gate, ControlType::False) => Some("Close"),
            (ControlClass::Pump, ControlType::True) => Some("On"),
            (ControlClass::Pump, ControlType::False) => Some("Off"),
            _ => None,
        }
    }

    pub fn is_actuator(&self) -> bool {
        !matches!(self, ControlClass::Sensor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Normal,
    Fault,
}

/// One sensor or actuator of the field network.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub current_value: Option<NodeValue>,
    pub control_class: ControlClass,
    pub status: DeviceStatus,
}

impl Node {
    pub fn new(id: NodeId, control_class: ControlClass, current_value: Option<NodeValue>) -> Self {
        Node { id, current_value, control_class, status: DeviceStatus::Normal }
    }

    pub fn is_normal_operation(&self) -> bool {
        self.status == DeviceStatus::Normal
    }

    /// True if the node already sits at the state a command would drive it to.
    ///
    /// With an explicit `set_value` the current value must match it. Without one the
    /// current value must match the label the control class gives to `control_type`.
    pub fn is_at_target(&self, control_type: ControlType, set_value: Option<&NodeValue>) -> bool {
        let Some(current) = &self.current_value else {
            return false;
        };

        match set_value {
            Some(target) => current.matches(target),
            None => self.control_class.label_for(control_type).is_some_and(|label| current.matches_label(label)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pump_label_matches_case_insensitive() {
        let pump = Node::new(NodeId::new("P_001"), ControlClass::Pump, Some(NodeValue::from("on")));

        assert!(pump.is_at_target(ControlType::True, None));
        assert!(!pump.is_at_target(ControlType::False, None));
    }

    #[test]
    fn test_set_value_takes_precedence_over_label() {
        let gate = Node::new(NodeId::new("G_001"), ControlClass::Gate, Some(NodeValue::Number(40.0)));

        assert!(gate.is_at_target(ControlType::Set, Some(&NodeValue::Number(40.0))));
        assert!(!gate.is_at_target(ControlType::Set, Some(&NodeValue::Number(45.0))));
        assert!(!gate.is_at_target(ControlType::True, None));
    }

    #[test]
    fn test_node_without_value_is_never_at_target() {
        let valve = Node::new(NodeId::new("V_001"), ControlClass::Valve, None);
        assert!(!valve.is_at_target(ControlType::False, None));
    }
}
