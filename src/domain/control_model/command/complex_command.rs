use std::collections::HashSet;

use crate::domain::control_model::command::command_types::{
    CommandStep, ControlType, WrapCommandFormat, WrapCommandRef, WrapCommandType,
};
use crate::domain::control_model::command::goal_spec::GoalSpec;
use crate::domain::control_model::command_manager::control_mode::ControlMode;
use crate::domain::control_model::node::node::NodeValue;
use crate::domain::control_model::utils::id::{CommandUuid, NodeId, WrapCommandId};

/// Atomic command against one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementCommand {
    pub node_id: NodeId,
    pub command_uuid: CommandUuid,
}

/// Element commands sharing one control intent.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerCommand {
    pub control_type: ControlType,
    pub set_value: Option<NodeValue>,
    pub elements: Vec<ElementCommand>,
}

impl ContainerCommand {
    /// Copy of this container restricted to the elements accepted by `keep`.
    pub fn filtered(&self, mut keep: impl FnMut(&ElementCommand) -> bool) -> ContainerCommand {
        ContainerCommand {
            control_type: self.control_type,
            set_value: self.set_value.clone(),
            elements: self.elements.iter().filter(|element| keep(element)).cloned().collect(),
        }
    }
}

/// The two endpoints of a FLOW command (e.g. upstream and downstream gate of a transfer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEndpoints {
    pub source: NodeId,
    pub destination: NodeId,
}

/// Requested container before element UUIDs are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRequest {
    pub control_type: ControlType,
    pub set_value: Option<NodeValue>,
    pub node_ids: Vec<NodeId>,
}

/// What a command source asks for. Turned into a [`ComplexCommand`] at submit time.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexCommandRequest {
    pub wrap_cmd_id: WrapCommandId,
    pub wrap_cmd_type: WrapCommandType,
    pub wrap_cmd_format: WrapCommandFormat,
    pub containers: Vec<ContainerRequest>,
    pub goal_spec: Option<GoalSpec>,
    pub flow_endpoints: Option<FlowEndpoints>,
}

impl ComplexCommandRequest {
    pub fn new(wrap_cmd_id: impl Into<WrapCommandId>, wrap_cmd_type: WrapCommandType, wrap_cmd_format: WrapCommandFormat) -> Self {
        Self {
            wrap_cmd_id: wrap_cmd_id.into(),
            wrap_cmd_type,
            wrap_cmd_format,
            containers: Vec::new(),
            goal_spec: None,
            flow_endpoints: None,
        }
    }

    pub fn control(wrap_cmd_id: impl Into<WrapCommandId>) -> Self {
        Self::new(wrap_cmd_id, WrapCommandType::Control, WrapCommandFormat::Single)
    }

    pub fn with_container(mut self, control_type: ControlType, set_value: Option<NodeValue>, node_ids: &[&str]) -> Self {
        self.containers.push(ContainerRequest {
            control_type,
            set_value,
            node_ids: node_ids.iter().map(|id| NodeId::new(*id)).collect(),
        });
        self
    }

    pub fn with_goals(mut self, goal_spec: GoalSpec) -> Self {
        self.goal_spec = Some(goal_spec);
        self
    }

    pub fn with_flow(mut self, source: &str, destination: &str) -> Self {
        self.wrap_cmd_format = WrapCommandFormat::Flow;
        self.flow_endpoints = Some(FlowEndpoints { source: NodeId::new(source), destination: NodeId::new(destination) });
        self
    }

    pub fn wrap_ref(&self) -> WrapCommandRef {
        WrapCommandRef::new(self.wrap_cmd_type, self.wrap_cmd_id.clone())
    }

    /// Every node the request names: targets, goal nodes and flow endpoints.
    pub fn referenced_node_ids(&self) -> impl Iterator<Item = &NodeId> {
        let targets = self.containers.iter().flat_map(|container| container.node_ids.iter());
        let goals = self.goal_spec.iter().flat_map(|spec| spec.goals.iter().map(|goal| &goal.node_id));
        let endpoints = self.flow_endpoints.iter().flat_map(|flow| [&flow.source, &flow.destination]);
        targets.chain(goals).chain(endpoints)
    }

    /// CANCEL request undoing a released SET/FLOW command.
    ///
    /// Everything the command switched on or drove to a value is switched off on the same
    /// nodes. Containers that already switch off or only measure have nothing to undo.
    /// Returns `None` when nothing is left to undo.
    pub fn cancellation_of(command: &ComplexCommand) -> Option<Self> {
        let containers: Vec<ContainerRequest> = command
            .container_list
            .iter()
            .filter(|container| matches!(container.control_type, ControlType::True | ControlType::Set))
            .map(|container| ContainerRequest {
                control_type: ControlType::False,
                set_value: None,
                node_ids: container.elements.iter().map(|element| element.node_id.clone()).collect(),
            })
            .filter(|container| !container.node_ids.is_empty())
            .collect();

        if containers.is_empty() {
            return None;
        }

        Some(Self {
            wrap_cmd_id: command.wrap_cmd_id.clone(),
            wrap_cmd_type: WrapCommandType::Cancel,
            wrap_cmd_format: command.wrap_cmd_format,
            containers,
            goal_spec: None,
            flow_endpoints: command.flow_endpoints.clone(),
        })
    }
}

/// One logical operator or automation request, possibly spanning many nodes.
#[derive(Debug, Clone)]
pub struct ComplexCommand {
    pub wrap_cmd_id: WrapCommandId,
    pub wrap_cmd_type: WrapCommandType,
    pub wrap_cmd_format: WrapCommandFormat,

    /// The requested commands.
    pub container_list: Vec<ContainerCommand>,

    /// The subset of `container_list` elements that actually has to be transmitted.
    pub real_container_list: Vec<ContainerCommand>,

    pub goal_spec: Option<GoalSpec>,
    pub flow_endpoints: Option<FlowEndpoints>,
    pub control_mode_at_creation: Option<ControlMode>,
    pub step: CommandStep,

    /// Control-plane clock time in ms when the command was built.
    pub created_at_ms: i64,

    /// Real element commands not yet acknowledged by the device layer.
    pub awaiting_ack: HashSet<CommandUuid>,
}

impl ComplexCommand {
    pub fn from_request(request: ComplexCommandRequest, created_at_ms: i64) -> Self {
        let container_list = request
            .containers
            .into_iter()
            .map(|container| ContainerCommand {
                control_type: container.control_type,
                set_value: container.set_value,
                elements: container
                    .node_ids
                    .into_iter()
                    .map(|node_id| ElementCommand { node_id, command_uuid: CommandUuid::random() })
                    .collect(),
            })
            .collect();

        ComplexCommand {
            wrap_cmd_id: request.wrap_cmd_id,
            wrap_cmd_type: request.wrap_cmd_type,
            wrap_cmd_format: request.wrap_cmd_format,
            container_list,
            real_container_list: Vec::new(),
            goal_spec: request.goal_spec.filter(|spec| !spec.is_empty()),
            flow_endpoints: request.flow_endpoints,
            control_mode_at_creation: None,
            step: CommandStep::Wait,
            created_at_ms,
            awaiting_ack: HashSet::new(),
        }
    }

    pub fn wrap_ref(&self) -> WrapCommandRef {
        WrapCommandRef::new(self.wrap_cmd_type, self.wrap_cmd_id.clone())
    }

    pub fn is_measure(&self) -> bool {
        self.wrap_cmd_type == WrapCommandType::Measure
    }

    pub fn elements(&self) -> impl Iterator<Item = (&ContainerCommand, &ElementCommand)> {
        self.container_list.iter().flat_map(|container| container.elements.iter().map(move |element| (container, element)))
    }

    pub fn real_elements(&self) -> impl Iterator<Item = (&ContainerCommand, &ElementCommand)> {
        self.real_container_list.iter().flat_map(|container| container.elements.iter().map(move |element| (container, element)))
    }

    pub fn real_element_count(&self) -> usize {
        self.real_container_list.iter().map(|container| container.elements.len()).sum()
    }

    pub fn real_command_uuids(&self) -> Vec<CommandUuid> {
        self.real_elements().map(|(_, element)| element.command_uuid.clone()).collect()
    }

    /// Every node the command targets, in request order, without duplicates.
    pub fn target_node_ids(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.elements().map(|(_, element)| element.node_id.clone()).filter(|node_id| seen.insert(node_id.clone())).collect()
    }

    pub fn goal_node_ids(&self) -> Vec<NodeId> {
        self.goal_spec.iter().flat_map(|spec| spec.goals.iter().map(|goal| goal.node_id.clone())).collect()
    }

    pub fn has_flow_endpoints(&self, source: &NodeId, destination: &NodeId) -> bool {
        self.flow_endpoints.as_ref().is_some_and(|endpoints| &endpoints.source == source && &endpoints.destination == destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_element_gets_its_own_uuid() {
        let request = ComplexCommandRequest::control("cmd-1").with_container(ControlType::True, None, &["V_001", "V_002"]);
        let command = ComplexCommand::from_request(request, 0);

        let uuids: HashSet<_> = command.elements().map(|(_, element)| element.command_uuid.clone()).collect();
        assert_eq!(uuids.len(), 2);
        assert!(command.real_container_list.is_empty());
    }

    #[test]
    fn test_cancellation_switches_off_running_containers() {
        let request = ComplexCommandRequest::control("transfer")
            .with_container(ControlType::True, None, &["G_001", "P_001"])
            .with_container(ControlType::False, None, &["V_009"])
            .with_container(ControlType::Set, Some(NodeValue::Number(30.0)), &["G_002"])
            .with_flow("G_001", "G_002");
        let command = ComplexCommand::from_request(request, 0);

        let cancel = ComplexCommandRequest::cancellation_of(&command).expect("SET and TRUE containers have to be undone");

        assert_eq!(cancel.wrap_cmd_type, WrapCommandType::Cancel);
        assert_eq!(cancel.wrap_cmd_id, command.wrap_cmd_id);
        assert_eq!(cancel.containers.len(), 2);
        assert!(cancel.containers.iter().all(|container| container.control_type == ControlType::False));
        assert_eq!(cancel.containers[0].node_ids, vec![NodeId::new("G_001"), NodeId::new("P_001")]);
        assert_eq!(cancel.containers[1].node_ids, vec![NodeId::new("G_002")]);
    }

    #[test]
    fn test_cancellation_of_switch_off_only_command_is_empty() {
        let request = ComplexCommandRequest::control("close").with_container(ControlType::False, None, &["V_001"]);
        let command = ComplexCommand::from_request(request, 0);

        assert!(ComplexCommandRequest::cancellation_of(&command).is_none());
    }
}
