use crate::domain::control_model::command::complex_command::{ComplexCommand, ContainerCommand, ElementCommand};
use crate::domain::control_model::command_manager::{automatic, manual};
use crate::domain::control_model::node::node_registry::NodeRegistry;
use crate::domain::control_model::overlap::overlap_ledger::OverlapLedger;
use crate::error::CommandError;

/// Who is driving the field right now.
///
/// Manual commands come from an operator and take precedence: they are never rejected for
/// conflicts and never merged into another request. Automatic commands come from an algorithm
/// and must neither fight a queued opposite request nor flood a device with duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMode {
    Automatic,
    Manual,
}

impl ControlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMode::Automatic => "Automatic",
            ControlMode::Manual => "Manual",
        }
    }

    /// Mode specific admission check, run before any ledger mutation.
    pub fn check_admission(&self, ledger: &OverlapLedger, command: &ComplexCommand) -> Result<(), CommandError> {
        match self {
            ControlMode::Automatic => automatic::check_admission(ledger, command),
            ControlMode::Manual => Ok(()),
        }
    }

    /// The part of the requested containers that actually has to be transmitted.
    /// Containers left without elements are dropped.
    pub fn compute_real_commands(&self, registry: &NodeRegistry, ledger: &OverlapLedger, command: &ComplexCommand) -> Vec<ContainerCommand> {
        command
            .container_list
            .iter()
            .map(|container| {
                container.filtered(|element| {
                    let state = ElementState::inspect(registry, ledger, container, element);
                    match self {
                        ControlMode::Automatic => automatic::is_real(&state),
                        ControlMode::Manual => manual::is_real(&state),
                    }
                })
            })
            .filter(|container| !container.elements.is_empty())
            .collect()
    }
}

/// Explicit holder of the mode every submission is judged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlContext {
    pub mode: ControlMode,
}

impl ControlContext {
    pub fn new(mode: ControlMode) -> Self {
        Self { mode }
    }
}

/// What the redundancy rules need to know about one requested element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementState {
    /// The node already reports the requested state.
    pub at_target: bool,

    /// Some element command already owns driving the node into the requested state.
    pub reserved: bool,

    /// Other commands wait on the requested state but nobody transmits it.
    pub pending_unreserved: bool,
}

impl ElementState {
    pub fn inspect(registry: &NodeRegistry, ledger: &OverlapLedger, container: &ContainerCommand, element: &ElementCommand) -> Self {
        let at_target = registry
            .get_node(&element.node_id)
            .is_some_and(|node| node.is_at_target(container.control_type, container.set_value.as_ref()));

        let claim = ledger.find_claim(&element.node_id, container.control_type, container.set_value.as_ref());
        let reserved = claim.is_some_and(|claim| claim.is_reserved());
        let pending_unreserved = claim.is_some_and(|claim| claim.has_pending() && !claim.is_reserved());

        ElementState { at_target, reserved, pending_unreserved }
    }

    /// Redundant elements need no transmission: the node is there already or someone drives it there.
    pub fn is_redundant(&self) -> bool {
        self.at_target || self.reserved
    }
}
