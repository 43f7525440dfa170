pub mod scenario_node;
pub mod scenario_runner;
pub mod scenario_tree;
