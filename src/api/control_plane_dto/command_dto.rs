use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WrapCommandTypeDto {
    Control,
    Measure,
    Cancel,
    Restore,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WrapCommandFormatDto {
    #[default]
    Single,
    Set,
    Flow,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlTypeDto {
    True,
    False,
    Measure,
    Set,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalRangeDto {
    Lower,
    Equal,
    Upper,
}

/// Numbers stay numbers, everything else is a text state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum NodeValueDto {
    Number(f64),
    Text(String),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ComplexCommandDto {
    pub id: String,
    #[serde(rename = "type")]
    pub wrap_cmd_type: WrapCommandTypeDto,
    #[serde(default)]
    pub format: WrapCommandFormatDto,
    pub containers: Vec<ContainerDto>,
    #[serde(default)]
    pub goals: Option<GoalSpecDto>,
    #[serde(default)]
    pub flow: Option<FlowDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDto {
    pub control_type: ControlTypeDto,
    #[serde(default)]
    pub set_value: Option<NodeValueDto>,
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GoalSpecDto {
    pub goals: Vec<GoalDto>,
    #[serde(default)]
    pub timeout_sec: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GoalDto {
    pub node_id: String,
    pub value: NodeValueDto,
    pub range: GoalRangeDto,
    #[serde(default)]
    pub sole_sufficient: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FlowDto {
    pub source: String,
    pub destination: String,
}
