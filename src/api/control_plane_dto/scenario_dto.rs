use serde::{Deserialize, Serialize};

use crate::api::control_plane_dto::command_dto::ComplexCommandDto;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    pub id: String,
    pub steps: Vec<ScenarioEntryDto>,
}

/// A JSON array is a nested group, an object is a step.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ScenarioEntryDto {
    Group(Vec<ScenarioEntryDto>),
    Step(ScenarioStepDto),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStepDto {
    #[serde(default)]
    pub delay_sec: u64,
    pub command: ComplexCommandDto,
}
