use crate::domain::control_model::node::node::NodeValue;
use crate::domain::control_model::utils::id::NodeId;

/// Comparison a goal applies between the live value and its goal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalRange {
    /// Reached once the value drops below the goal value.
    Lower,
    Equal,
    /// Reached once the value rises above the goal value.
    Upper,
}

/// One threshold condition attached to a wrap command.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDefinition {
    pub node_id: NodeId,
    pub goal_value: NodeValue,
    pub goal_range: GoalRange,
    /// Reaching this goal alone releases the command.
    pub is_sole_sufficient: bool,
}

impl GoalDefinition {
    pub fn new(node_id: impl Into<NodeId>, goal_value: NodeValue, goal_range: GoalRange) -> Self {
        Self { node_id: node_id.into(), goal_value, goal_range, is_sole_sufficient: false }
    }

    pub fn sole_sufficient(mut self) -> Self {
        self.is_sole_sufficient = true;
        self
    }
}

/// Release condition of a wrap command: its goals plus an optional hold limit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoalSpec {
    pub goals: Vec<GoalDefinition>,
    pub timeout_sec: Option<u64>,
}

impl GoalSpec {
    pub fn new(goals: Vec<GoalDefinition>, timeout_sec: Option<u64>) -> Self {
        Self { goals, timeout_sec }
    }

    /// No goals and no hold limit: nothing would ever release the command.
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty() && self.timeout_sec.is_none()
    }
}
