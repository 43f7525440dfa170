pub mod audit;
pub mod command;
pub mod command_manager;
pub mod control_plane;
pub mod critical;
pub mod device;
pub mod dispatch;
pub mod node;
pub mod overlap;
pub mod plane_config;
pub mod scenario;
pub mod utils;
