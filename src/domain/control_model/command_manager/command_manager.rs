use std::collections::HashSet;

use crate::domain::control_model::command::command_types::{CommandStep, WrapCommandFormat, WrapCommandRef};
use crate::domain::control_model::command::complex_command::ComplexCommand;
use crate::domain::control_model::command::goal_spec::GoalSpec;
use crate::domain::control_model::command_manager::command_store::CommandStore;
use crate::domain::control_model::command_manager::control_mode::ControlContext;
use crate::domain::control_model::command_manager::transmitter::{DeviceTransmitter, ElementDispatch, TransmitOutcome};
use crate::domain::control_model::node::node_registry::NodeRegistry;
use crate::domain::control_model::overlap::overlap_ledger::OverlapLedger;
use crate::domain::control_model::utils::id::{CommandUuid, NodeId};
use crate::error::CommandError;

/// Result of an admitted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The command is active and its real element commands were handed to the transmitter.
    Accepted(WrapCommandRef),

    /// Nothing had to be transmitted: every requested state is already reached or already
    /// being driven by another command. The command was not stored. Callers treat this as
    /// success without action.
    NoOp(WrapCommandRef),
}

impl SubmitOutcome {
    pub fn wrap_ref(&self) -> &WrapCommandRef {
        match self {
            SubmitOutcome::Accepted(wrap_ref) | SubmitOutcome::NoOp(wrap_ref) => wrap_ref,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

/// Why an active command left the command manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFinish {
    /// Its goals were reached (or its hold timed out).
    Achieved,
    /// Transmitted and acknowledged, no goals to wait for.
    Completed,
    /// Cancelled by a command source.
    Cancelled,
    /// The device layer reported a failed transmission.
    Failed(String),
}

/// Result of a transmission acknowledgement.
#[derive(Debug)]
pub struct Acknowledgement {
    pub wrap_ref: WrapCommandRef,

    /// Set when the acknowledgement ended the command.
    pub finished: Option<(ComplexCommand, CommandFinish)>,
}

/// Admission, deduplication and overlap bookkeeping of wrap commands.
#[derive(Debug)]
pub struct CommandManager {
    store: CommandStore,
    ledger: OverlapLedger,
    transmitter: Box<dyn DeviceTransmitter>,
}

impl CommandManager {
    pub fn new(registry: &NodeRegistry, transmitter: Box<dyn DeviceTransmitter>) -> Self {
        Self { store: CommandStore::new(), ledger: OverlapLedger::new(registry.node_ids()), transmitter }
    }

    /// Admits a command, records it in the overlap ledger and transmits its real elements.
    ///
    /// Every check runs before the ledger is touched, so a rejected command leaves no trace.
    pub fn submit(&mut self, context: &ControlContext, registry: &NodeRegistry, mut command: ComplexCommand) -> Result<SubmitOutcome, CommandError> {
        let wrap_ref = command.wrap_ref();

        if self.store.contains(&wrap_ref) {
            return Err(CommandError::DuplicateCommand(wrap_ref));
        }

        self.validate_request(registry, &command)?;
        context.mode.check_admission(&self.ledger, &command)?;

        command.real_container_list = if command.is_measure() {
            command.container_list.clone()
        } else {
            if let Some(node_id) = Self::find_abnormal_node(registry, &command) {
                return Err(CommandError::AbnormalDevice { command: wrap_ref, node_id });
            }
            context.mode.compute_real_commands(registry, &self.ledger, &command)
        };

        if command.real_element_count() == 0 {
            log::info!("Command {} has nothing to transmit, every requested state is reached or owned.", wrap_ref);
            return Ok(SubmitOutcome::NoOp(wrap_ref));
        }

        if !command.is_measure() {
            self.ledger.record_request(&wrap_ref, &command.container_list, false)?;
            self.ledger.record_request(&wrap_ref, &command.real_container_list, true)?;
        }

        command.step = CommandStep::Wait;
        command.control_mode_at_creation = Some(context.mode);
        command.awaiting_ack = command.real_command_uuids().into_iter().collect();

        let priority = command.wrap_cmd_type.priority_rank();
        let dispatches: Vec<ElementDispatch> = command
            .real_elements()
            .map(|(container, element)| ElementDispatch {
                owner: wrap_ref.clone(),
                node_id: element.node_id.clone(),
                command_uuid: element.command_uuid.clone(),
                control_type: container.control_type,
                set_value: container.set_value.clone(),
                priority,
            })
            .collect();

        log::info!(
            "Command {} accepted in {} mode: {} of {} element commands are real.",
            wrap_ref,
            context.mode.as_str(),
            dispatches.len(),
            command.elements().count()
        );

        self.store.add(command);
        for dispatch in dispatches {
            self.transmitter.transmit(dispatch);
        }

        Ok(SubmitOutcome::Accepted(wrap_ref))
    }

    /// Removes an active command and releases its claims.
    ///
    /// # Returns
    /// The removed command, so the caller can tear down its goal group and undo SET/FLOW commands.
    pub fn cancel(&mut self, wrap_ref: &WrapCommandRef) -> Result<ComplexCommand, CommandError> {
        let command = self.store.remove(wrap_ref).ok_or_else(|| CommandError::UnknownCommand(wrap_ref.clone()))?;
        self.ledger.release(&command);

        log::info!("Command {} released its overlap claims.", wrap_ref);
        Ok(command)
    }

    /// Applies the device layer's result for one element command.
    ///
    /// A failed element fails the whole command. Once every element is delivered the command is
    /// TRANSMITTED, and commands without goals complete right away.
    /// Returns `None` for UUIDs that belong to no active command or were acknowledged before.
    pub fn acknowledge(&mut self, command_uuid: &CommandUuid, outcome: TransmitOutcome) -> Option<Acknowledgement> {
        let command = self.store.get_by_uuid_mut(command_uuid)?;
        let wrap_ref = command.wrap_ref();

        if !command.awaiting_ack.remove(command_uuid) {
            log::debug!("Ignoring repeated or unexpected acknowledgement {} for {}.", command_uuid, wrap_ref);
            return None;
        }

        let finish = match outcome {
            TransmitOutcome::Failed(reason) => {
                log::warn!("Transmission {} of command {} failed: {}", command_uuid, wrap_ref, reason);
                Some(CommandFinish::Failed(reason))
            }
            TransmitOutcome::Delivered if command.awaiting_ack.is_empty() => {
                command.step = CommandStep::Transmitted;
                if command.goal_spec.as_ref().is_none_or(GoalSpec::is_empty) { Some(CommandFinish::Completed) } else { None }
            }
            TransmitOutcome::Delivered => None,
        };

        let finished = match finish {
            Some(finish) => self.cancel(&wrap_ref).ok().map(|command| (command, finish)),
            None => None,
        };

        Some(Acknowledgement { wrap_ref, finished })
    }

    pub fn find_command_by_id(&self, wrap_ref: &WrapCommandRef) -> Option<&ComplexCommand> {
        self.store.get(wrap_ref)
    }

    pub fn find_command_by_flow_endpoints(&self, source: &NodeId, destination: &NodeId) -> Option<&ComplexCommand> {
        self.store.iter().find(|command| command.wrap_cmd_format == WrapCommandFormat::Flow && command.has_flow_endpoints(source, destination))
    }

    /// Active commands holding pending requests for other states of any node `command` targets.
    pub fn find_conflicts(&self, command: &ComplexCommand) -> Vec<WrapCommandRef> {
        let own_ref = command.wrap_ref();
        let mut seen = HashSet::new();

        command
            .elements()
            .flat_map(|(container, element)| self.ledger.conflicting_requests(&element.node_id, container.control_type, container.set_value.as_ref()))
            .filter(|wrap_ref| wrap_ref != &own_ref && seen.insert(wrap_ref.clone()))
            .collect()
    }

    pub fn active_commands(&self) -> impl Iterator<Item = &ComplexCommand> {
        self.store.iter()
    }

    pub fn active_count(&self) -> usize {
        self.store.len()
    }

    pub fn ledger(&self) -> &OverlapLedger {
        &self.ledger
    }

    fn validate_request(&self, registry: &NodeRegistry, command: &ComplexCommand) -> Result<(), CommandError> {
        if command.container_list.iter().all(|container| container.elements.is_empty()) {
            return Err(CommandError::InvalidRequest(format!("{} requests no element commands", command.wrap_ref())));
        }

        if let Some(node_id) = command.target_node_ids().into_iter().chain(command.goal_node_ids()).find(|node_id| !registry.contains(node_id)) {
            return Err(CommandError::UnknownNode(node_id));
        }

        if command.wrap_cmd_format == WrapCommandFormat::Flow {
            let endpoints = command
                .flow_endpoints
                .as_ref()
                .ok_or_else(|| CommandError::InvalidRequest(format!("FLOW command {} has no flow endpoints", command.wrap_ref())))?;

            for endpoint in [&endpoints.source, &endpoints.destination] {
                if !registry.contains(endpoint) {
                    return Err(CommandError::UnknownNode(endpoint.clone()));
                }
            }
        }
        Ok(())
    }

    fn find_abnormal_node(registry: &NodeRegistry, command: &ComplexCommand) -> Option<NodeId> {
        command
            .target_node_ids()
            .into_iter()
            .find(|node_id| registry.get_node(node_id).is_some_and(|node| !node.is_normal_operation()))
    }
}
