pub mod observer_hub;
pub mod update_dispatcher;
