use crate::domain::control_model::command_manager::control_mode::ElementState;

/// Operator commands transmit exactly what is not already there or already being driven there.
pub fn is_real(state: &ElementState) -> bool {
    !state.is_redundant()
}
