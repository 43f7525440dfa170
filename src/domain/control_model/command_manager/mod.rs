pub mod automatic;
pub mod command_manager;
pub mod command_store;
pub mod control_mode;
pub mod manual;
pub mod transmitter;
