use thiserror::Error;

use crate::domain::control_model::command::command_types::WrapCommandRef;
use crate::domain::control_model::utils::id::{NodeId, ScenarioId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse control plane configuration JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to build control plane model: {0}")]
    ModelConstructionError(String),

    #[error("Node {0} is not registered in the node registry")]
    UnknownNode(NodeId),

    #[error("Scenario {0} is not configured")]
    UnknownScenario(ScenarioId),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Rejections of a wrap command submission or cancellation.
///
/// Admission errors are returned to the submitter, who decides whether to retry, alter or drop
/// the request. A submission that has nothing left to transmit is not an error, see
/// `SubmitOutcome::NoOp`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("Command {0} is already active")]
    DuplicateCommand(WrapCommandRef),

    #[error("Command {command} conflicts on node {node_id} with pending requests of {contested_by:?}")]
    ConflictingCommand { command: WrapCommandRef, node_id: NodeId, contested_by: Vec<WrapCommandRef> },

    #[error("Command {command} targets node {node_id}, which is not in normal operation")]
    AbnormalDevice { command: WrapCommandRef, node_id: NodeId },

    #[error("Node {0} is not registered")]
    UnknownNode(NodeId),

    #[error("Command {0} is not active")]
    UnknownCommand(WrapCommandRef),

    #[error("Invalid command request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
