use std::fmt;

use crate::domain::control_model::utils::id::WrapCommandId;

/// What a wrap command is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WrapCommandType {
    Control,
    Measure,
    Cancel,
    Restore,
}

impl WrapCommandType {
    /// Transmission priority, 0 is the most urgent.
    /// CANCEL commands undo something already driving the field and go first.
    pub fn priority_rank(&self) -> u8 {
        match self {
            WrapCommandType::Cancel => 0,
            WrapCommandType::Restore => 1,
            WrapCommandType::Control => 2,
            WrapCommandType::Measure => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WrapCommandType::Control => "CONTROL",
            WrapCommandType::Measure => "MEASURE",
            WrapCommandType::Cancel => "CANCEL",
            WrapCommandType::Restore => "RESTORE",
        }
    }
}

/// Shape of a wrap command.
///
/// SINGLE drives nodes to a state, SET drives nodes to a value and FLOW opens a transfer
/// path between two endpoint nodes. SET and FLOW commands leave the field in a running state,
/// so their cancellation is itself a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapCommandFormat {
    Single,
    Set,
    Flow,
}

impl WrapCommandFormat {
    pub fn needs_cancel_command(&self) -> bool {
        matches!(self, WrapCommandFormat::Set | WrapCommandFormat::Flow)
    }
}

/// Control intent of a container command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    True,
    False,
    Measure,
    Set,
}

/// Lifecycle step of an accepted wrap command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStep {
    /// Accepted, real element commands handed to the transmitter, acknowledgements outstanding.
    Wait,
    /// Every real element command was acknowledged by the device layer.
    Transmitted,
}

/// Identity of a wrap command. Ids are only unique per command type, a CANCEL command
/// reuses the id of the command it cancels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WrapCommandRef {
    pub wrap_cmd_type: WrapCommandType,
    pub wrap_cmd_id: WrapCommandId,
}

impl WrapCommandRef {
    pub fn new(wrap_cmd_type: WrapCommandType, wrap_cmd_id: impl Into<WrapCommandId>) -> Self {
        Self { wrap_cmd_type, wrap_cmd_id: wrap_cmd_id.into() }
    }

    pub fn control(wrap_cmd_id: impl Into<WrapCommandId>) -> Self {
        Self::new(WrapCommandType::Control, wrap_cmd_id)
    }
}

impl fmt::Display for WrapCommandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.wrap_cmd_type.as_str(), self.wrap_cmd_id)
    }
}
