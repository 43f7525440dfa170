use crate::domain::control_model::command::command_types::{ControlType, WrapCommandRef};
use crate::domain::control_model::node::node::NodeValue;
use crate::domain::control_model::utils::id::CommandUuid;

/// Bookkeeping of one (control type, set value) state of a node.
///
/// A claim is never removed once created, it is only cleared, so lookups stay stable for the
/// lifetime of the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapClaim {
    pub control_type: ControlType,
    pub set_value: Option<NodeValue>,

    /// Wrap commands that requested this state and depend on it.
    pub pending_requests: Vec<WrapCommandRef>,

    /// Element command that currently owns driving the node into this state.
    pub reserving_uuid: Option<CommandUuid>,
}

impl OverlapClaim {
    pub fn new(control_type: ControlType, set_value: Option<NodeValue>) -> Self {
        Self { control_type, set_value, pending_requests: Vec::new(), reserving_uuid: None }
    }

    pub fn is_for(&self, control_type: ControlType, set_value: Option<&NodeValue>) -> bool {
        self.control_type == control_type && self.set_value.as_ref() == set_value
    }

    pub fn is_reserved(&self) -> bool {
        self.reserving_uuid.is_some()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_requests.is_empty()
    }

    pub fn is_idle(&self) -> bool {
        !self.is_reserved() && !self.has_pending()
    }
}
