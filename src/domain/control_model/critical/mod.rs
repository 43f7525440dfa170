pub mod critical_goal;
pub mod critical_group;
pub mod critical_manager;
