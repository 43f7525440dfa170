use slotmap::new_key_type;

use crate::domain::control_model::command::command_types::WrapCommandRef;
use crate::domain::control_model::command::complex_command::ComplexCommandRequest;
use crate::domain::control_model::utils::timer_queue::TimerId;

new_key_type! {
    pub struct ScenarioNodeKey;
}

/// Input shape of a scenario: plain entries are steps, nested lists are groups.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioEntry {
    Step(ScenarioStepSpec),
    Group(Vec<ScenarioEntry>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioStepSpec {
    pub request: ComplexCommandRequest,
    pub delay_sec: u64,
}

impl ScenarioEntry {
    pub fn step(request: ComplexCommandRequest) -> Self {
        ScenarioEntry::Step(ScenarioStepSpec { request, delay_sec: 0 })
    }

    pub fn delayed_step(request: ComplexCommandRequest, delay_sec: u64) -> Self {
        ScenarioEntry::Step(ScenarioStepSpec { request, delay_sec })
    }

    /// Command requests of this entry and all nested entries, depth first.
    pub fn requests(&self) -> Vec<&ComplexCommandRequest> {
        match self {
            ScenarioEntry::Step(step) => vec![&step.request],
            ScenarioEntry::Group(children) => children.iter().flat_map(ScenarioEntry::requests).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    Idle,
    /// Delay timer armed, the command goes out when it fires.
    Waiting(TimerId),
    /// Delay elapsed.
    Ready,
    Issued(WrapCommandRef),
    Complete,
}

#[derive(Debug, Clone)]
pub struct ScenarioStep {
    pub parent: Option<ScenarioNodeKey>,
    pub request: ComplexCommandRequest,
    pub delay_sec: u64,
    pub state: StepState,
}

#[derive(Debug, Clone)]
pub struct ScenarioGroup {
    pub parent: Option<ScenarioNodeKey>,
    /// Synchronous groups run one child after the other, asynchronous groups all at once.
    pub is_synchronous: bool,
    pub children: Vec<ScenarioNodeKey>,
    /// Next child of a synchronous group. Only ever moves forward.
    pub cursor: usize,
    /// Completed children of an asynchronous group.
    pub completed: usize,
    pub is_complete: bool,
}

#[derive(Debug, Clone)]
pub enum ScenarioNode {
    Group(ScenarioGroup),
    Step(ScenarioStep),
}

impl ScenarioNode {
    pub fn parent(&self) -> Option<ScenarioNodeKey> {
        match self {
            ScenarioNode::Group(group) => group.parent,
            ScenarioNode::Step(step) => step.parent,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            ScenarioNode::Group(group) => group.is_complete,
            ScenarioNode::Step(step) => step.state == StepState::Complete,
        }
    }
}
