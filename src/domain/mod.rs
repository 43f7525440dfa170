pub mod clock;
pub mod control_model;
