pub mod command_types;
pub mod complex_command;
pub mod goal_spec;
