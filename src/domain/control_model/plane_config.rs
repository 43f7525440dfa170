use std::collections::HashMap;

use crate::api::control_plane_dto::command_dto::{
    ComplexCommandDto, ControlTypeDto, GoalRangeDto, GoalSpecDto, NodeValueDto, WrapCommandFormatDto, WrapCommandTypeDto,
};
use crate::api::control_plane_dto::config_dto::{ControlClassDto, ControlModeDto, ControlPlaneConfigDto, DeviceStatusDto, NodeDto};
use crate::api::control_plane_dto::scenario_dto::ScenarioEntryDto;
use crate::domain::control_model::command::command_types::{ControlType, WrapCommandFormat, WrapCommandType};
use crate::domain::control_model::command::complex_command::{ComplexCommandRequest, ContainerRequest, FlowEndpoints};
use crate::domain::control_model::command::goal_spec::{GoalDefinition, GoalRange, GoalSpec};
use crate::domain::control_model::command_manager::control_mode::ControlMode;
use crate::domain::control_model::node::node::{ControlClass, DeviceStatus, Node, NodeValue};
use crate::domain::control_model::scenario::scenario_node::{ScenarioEntry, ScenarioStepSpec};
use crate::domain::control_model::utils::id::{NodeId, ScenarioId, WrapCommandId};
use crate::error::Error;

/// Domain form of the configuration file.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub control_mode: ControlMode,
    pub tick_interval_ms: u64,
    pub nodes: Vec<Node>,
    pub scenarios: HashMap<ScenarioId, Vec<ScenarioEntry>>,
}

impl TryFrom<ControlPlaneConfigDto> for ControlPlaneConfig {
    type Error = Error;

    fn try_from(dto: ControlPlaneConfigDto) -> Result<Self, Self::Error> {
        if dto.tick_interval_ms == 0 {
            return Err(Error::ModelConstructionError("tickIntervalMs must be positive.".to_string()));
        }

        let nodes = dto.nodes.into_iter().map(Node::from).collect();

        let mut scenarios = HashMap::new();
        for scenario in dto.scenarios {
            let scenario_id = ScenarioId::new(scenario.id);
            let entries = scenario.steps.into_iter().map(ScenarioEntry::try_from).collect::<Result<Vec<_>, _>>()?;

            if scenarios.insert(scenario_id.clone(), entries).is_some() {
                return Err(Error::ModelConstructionError(format!("Scenario {} is configured twice.", scenario_id)));
            }
        }

        Ok(ControlPlaneConfig { control_mode: dto.control_mode.into(), tick_interval_ms: dto.tick_interval_ms, nodes, scenarios })
    }
}

impl From<ControlModeDto> for ControlMode {
    fn from(dto: ControlModeDto) -> Self {
        match dto {
            ControlModeDto::Automatic => ControlMode::Automatic,
            ControlModeDto::Manual => ControlMode::Manual,
        }
    }
}

impl From<NodeValueDto> for NodeValue {
    fn from(dto: NodeValueDto) -> Self {
        match dto {
            NodeValueDto::Number(value) => NodeValue::Number(value),
            NodeValueDto::Text(text) => NodeValue::Text(text),
        }
    }
}

impl From<NodeDto> for Node {
    fn from(dto: NodeDto) -> Self {
        let control_class = match dto.control_class {
            ControlClassDto::Valve => ControlClass::Valve,
            ControlClassDto::Gate => ControlClass::Gate,
            ControlClassDto::Pump => ControlClass::Pump,
            ControlClassDto::Sensor => ControlClass::Sensor,
        };

        let mut node = Node::new(NodeId::new(dto.id), control_class, dto.value.map(NodeValue::from));
        node.status = match dto.status {
            DeviceStatusDto::Normal => DeviceStatus::Normal,
            DeviceStatusDto::Fault => DeviceStatus::Fault,
        };
        node
    }
}

impl TryFrom<ScenarioEntryDto> for ScenarioEntry {
    type Error = Error;

    fn try_from(dto: ScenarioEntryDto) -> Result<Self, Self::Error> {
        match dto {
            ScenarioEntryDto::Group(entries) => {
                Ok(ScenarioEntry::Group(entries.into_iter().map(ScenarioEntry::try_from).collect::<Result<Vec<_>, _>>()?))
            }
            ScenarioEntryDto::Step(step) => {
                Ok(ScenarioEntry::Step(ScenarioStepSpec { request: ComplexCommandRequest::try_from(step.command)?, delay_sec: step.delay_sec }))
            }
        }
    }
}

impl TryFrom<ComplexCommandDto> for ComplexCommandRequest {
    type Error = Error;

    fn try_from(dto: ComplexCommandDto) -> Result<Self, Self::Error> {
        let wrap_cmd_type = match dto.wrap_cmd_type {
            WrapCommandTypeDto::Control => WrapCommandType::Control,
            WrapCommandTypeDto::Measure => WrapCommandType::Measure,
            WrapCommandTypeDto::Cancel => WrapCommandType::Cancel,
            WrapCommandTypeDto::Restore => WrapCommandType::Restore,
        };
        let wrap_cmd_format = match dto.format {
            WrapCommandFormatDto::Single => WrapCommandFormat::Single,
            WrapCommandFormatDto::Set => WrapCommandFormat::Set,
            WrapCommandFormatDto::Flow => WrapCommandFormat::Flow,
        };

        let mut containers = Vec::with_capacity(dto.containers.len());
        for container in dto.containers {
            let control_type = match container.control_type {
                ControlTypeDto::True => ControlType::True,
                ControlTypeDto::False => ControlType::False,
                ControlTypeDto::Measure => ControlType::Measure,
                ControlTypeDto::Set => ControlType::Set,
            };
            if control_type == ControlType::Set && container.set_value.is_none() {
                return Err(Error::ModelConstructionError(format!("Command {}: SET container without setValue.", dto.id)));
            }

            containers.push(ContainerRequest {
                control_type,
                set_value: container.set_value.map(NodeValue::from),
                node_ids: container.nodes.into_iter().map(NodeId::new).collect(),
            });
        }

        Ok(ComplexCommandRequest {
            wrap_cmd_id: WrapCommandId::new(dto.id),
            wrap_cmd_type,
            wrap_cmd_format,
            containers,
            goal_spec: dto.goals.map(GoalSpec::from).filter(|spec| !spec.is_empty()),
            flow_endpoints: dto.flow.map(|flow| FlowEndpoints { source: NodeId::new(flow.source), destination: NodeId::new(flow.destination) }),
        })
    }
}

impl From<GoalSpecDto> for GoalSpec {
    fn from(dto: GoalSpecDto) -> Self {
        let goals = dto
            .goals
            .into_iter()
            .map(|goal| GoalDefinition {
                node_id: NodeId::new(goal.node_id),
                goal_value: goal.value.into(),
                goal_range: match goal.range {
                    GoalRangeDto::Lower => GoalRange::Lower,
                    GoalRangeDto::Equal => GoalRange::Equal,
                    GoalRangeDto::Upper => GoalRange::Upper,
                },
                is_sole_sufficient: goal.sole_sufficient,
            })
            .collect();

        GoalSpec::new(goals, dto.timeout_sec)
    }
}
