use crate::domain::control_model::command::command_types::{ControlType, WrapCommandRef};
use crate::domain::control_model::node::node::NodeValue;
use crate::domain::control_model::utils::id::{CommandUuid, NodeId};

/// Everything the device layer needs to drive one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDispatch {
    pub owner: WrapCommandRef,
    pub node_id: NodeId,
    pub command_uuid: CommandUuid,
    pub control_type: ControlType,
    pub set_value: Option<NodeValue>,
    /// Priority rank of the owning wrap command type, 0 goes first.
    pub priority: u8,
}

/// Result of one transmission, reported back through `ControlPlane::on_transmit_result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmitOutcome {
    Delivered,
    Failed(String),
}

/// Outbound seam to the device layer.
///
/// `transmit` only hands the element over. Framing, connections and retries belong to the
/// transport; the outcome arrives later as a [`TransmitOutcome`].
pub trait DeviceTransmitter: std::fmt::Debug + Send {
    fn transmit(&self, dispatch: ElementDispatch);
}
