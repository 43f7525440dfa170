use std::path::Path;

use crate::api::control_plane_dto::config_dto::ControlPlaneConfigDto;
use crate::domain::clock::clock::SharedClock;
use crate::domain::control_model::command_manager::transmitter::DeviceTransmitter;
use crate::domain::control_model::control_plane::ControlPlane;
use crate::domain::control_model::plane_config::ControlPlaneConfig;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads and validates a configuration file.
pub fn load_config(file_path: impl AsRef<Path>) -> Result<ControlPlaneConfig> {
    let root_dto: ControlPlaneConfigDto = parse_json_file(file_path.as_ref())?;
    log::info!("Configuration {} parsed successfully.", file_path.as_ref().display());

    let config = ControlPlaneConfig::try_from(root_dto)?;
    log::info!("Configuration has {} nodes and {} scenarios.", config.nodes.len(), config.scenarios.len());
    Ok(config)
}

/// Builds a control plane straight from a configuration file.
pub fn generate_control_plane(file_path: impl AsRef<Path>, transmitter: Box<dyn DeviceTransmitter>, clock: SharedClock) -> Result<ControlPlane> {
    let config = load_config(file_path)?;
    let control_plane = ControlPlane::from_config(config, transmitter, clock)?;
    log::info!("Control plane constructed successfully.");
    Ok(control_plane)
}
