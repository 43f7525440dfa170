use crate::domain::control_model::command::command_types::WrapCommandType;
use crate::domain::control_model::command::complex_command::ComplexCommand;
use crate::domain::control_model::command_manager::control_mode::ElementState;
use crate::domain::control_model::overlap::overlap_ledger::OverlapLedger;
use crate::error::CommandError;

/// Rejects CONTROL commands that would fight a queued request for another state of one of
/// their nodes. Other command types pass.
pub fn check_admission(ledger: &OverlapLedger, command: &ComplexCommand) -> Result<(), CommandError> {
    if command.wrap_cmd_type != WrapCommandType::Control {
        return Ok(());
    }

    for (container, element) in command.elements() {
        let set_value = container.set_value.as_ref();

        if ledger.has_conflict(&element.node_id, container.control_type, set_value) {
            let contested_by = ledger.conflicting_requests(&element.node_id, container.control_type, set_value);
            log::info!("Automatic command {} rejected: node {} is contested by {:?}.", command.wrap_ref(), element.node_id, contested_by);

            return Err(CommandError::ConflictingCommand { command: command.wrap_ref(), node_id: element.node_id.clone(), contested_by });
        }
    }
    Ok(())
}

/// A reserved state is never transmitted twice. A state other commands wait on without anybody
/// owning it is transmitted by this command, even if the node already reports it, so the waiting
/// commands get an owner. Everything else follows plain redundancy.
pub fn is_real(state: &ElementState) -> bool {
    if state.reserved {
        return false;
    }
    if state.pending_unreserved {
        return true;
    }
    !state.is_redundant()
}
