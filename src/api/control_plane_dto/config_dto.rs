use serde::{Deserialize, Serialize};

use crate::api::control_plane_dto::command_dto::NodeValueDto;
use crate::api::control_plane_dto::scenario_dto::ScenarioDto;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlModeDto {
    Automatic,
    Manual,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlClassDto {
    Valve,
    Gate,
    Pump,
    Sensor,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatusDto {
    #[default]
    Normal,
    Fault,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfigDto {
    pub control_mode: ControlModeDto,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    pub nodes: Vec<NodeDto>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioDto>,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NodeDto {
    pub id: String,
    pub control_class: ControlClassDto,
    #[serde(default)]
    pub value: Option<NodeValueDto>,
    #[serde(default)]
    pub status: DeviceStatusDto,
}
