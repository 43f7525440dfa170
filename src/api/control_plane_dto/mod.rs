pub mod command_dto;
pub mod config_dto;
pub mod scenario_dto;
