use std::sync::Arc;

use field_control_plane::domain::clock::clock_mock::MockClock;
use field_control_plane::domain::control_model::command_manager::control_mode::ControlMode;
use field_control_plane::domain::control_model::device::loopback_transmitter::LoopbackTransmitter;
use field_control_plane::domain::control_model::node::node::{ControlClass, NodeValue};
use field_control_plane::domain::control_model::scenario::scenario_runner::ScenarioStatus;
use field_control_plane::domain::control_model::utils::id::{NodeId, ScenarioId};
use field_control_plane::error::Error;
use field_control_plane::{generate_control_plane, load_config};

const FIELD_NETWORK: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/data/field_network.json");

#[test]
fn test_load_field_network() {
    let config = load_config(FIELD_NETWORK).unwrap();

    assert_eq!(config.control_mode, ControlMode::Automatic);
    assert_eq!(config.tick_interval_ms, 500);
    assert_eq!(config.nodes.len(), 7);
    assert!(config.scenarios.contains_key(&ScenarioId::new("reservoir_transfer")));
    assert!(config.scenarios.contains_key(&ScenarioId::new("level_survey")));

    let gate = config.nodes.iter().find(|node| node.id == NodeId::new("G_003")).unwrap();
    assert_eq!(gate.control_class, ControlClass::Gate);
    assert_eq!(gate.current_value, Some(NodeValue::Number(0.0)));
}

#[test]
fn test_configured_scenario_starts_by_name() {
    let transmitter = LoopbackTransmitter::new();
    let mut plane = generate_control_plane(FIELD_NETWORK, Box::new(transmitter.clone()), Arc::new(MockClock::new(0))).unwrap();

    let run = plane.start_configured_scenario(&ScenarioId::new("reservoir_transfer")).unwrap();

    assert_eq!(plane.scenario_status(run), Some(&ScenarioStatus::Running));
    assert_eq!(transmitter.pending(), 1);
}

#[test]
fn test_missing_file_is_io_error() {
    assert!(matches!(load_config("does/not/exist.json"), Err(Error::IoError(_))));
}

#[test]
fn test_malformed_file_is_deserialization_error() {
    let path = std::env::temp_dir().join("field_control_plane_malformed.json");
    std::fs::write(&path, r#"{ "controlMode": "SOMETIMES", "nodes": [] }"#).unwrap();

    assert!(matches!(load_config(&path), Err(Error::DeserializationError(_))));
}

#[test]
fn test_duplicate_node_is_rejected() {
    let path = std::env::temp_dir().join("field_control_plane_duplicate.json");
    std::fs::write(
        &path,
        r#"{ "controlMode": "MANUAL", "nodes": [
            { "id": "P_001", "controlClass": "PUMP" },
            { "id": "P_001", "controlClass": "PUMP" }
        ] }"#,
    )
    .unwrap();

    let result = generate_control_plane(&path, Box::new(LoopbackTransmitter::new()), Arc::new(MockClock::new(0)));
    assert!(matches!(result, Err(Error::ModelConstructionError(_))));
}

#[test]
fn test_scenario_with_unregistered_node_aborts_startup() {
    let path = std::env::temp_dir().join("field_control_plane_unknown_scenario_node.json");
    std::fs::write(
        &path,
        r#"{ "controlMode": "AUTOMATIC", "nodes": [
            { "id": "P_001", "controlClass": "PUMP", "value": "Off" },
            { "id": "L_001", "controlClass": "SENSOR", "value": 1.0 }
        ], "scenarios": [{
            "id": "broken",
            "steps": [
                { "command": { "id": "pump", "type": "CONTROL", "containers": [{ "controlType": "TRUE", "nodes": ["P_001"] }] } },
                [
                    { "command": { "id": "gate", "type": "CONTROL", "containers": [{ "controlType": "TRUE", "nodes": ["X_404"] }] } }
                ]
            ]
        }] }"#,
    )
    .unwrap();

    let result = generate_control_plane(&path, Box::new(LoopbackTransmitter::new()), Arc::new(MockClock::new(0)));
    assert!(matches!(result, Err(Error::UnknownNode(node_id)) if node_id == NodeId::new("X_404")));
}

#[test]
fn test_scenario_goal_on_unregistered_node_aborts_startup() {
    let path = std::env::temp_dir().join("field_control_plane_unknown_goal_node.json");
    std::fs::write(
        &path,
        r#"{ "controlMode": "MANUAL", "nodes": [
            { "id": "P_001", "controlClass": "PUMP", "value": "Off" }
        ], "scenarios": [{
            "id": "fill",
            "steps": [
                { "command": { "id": "pump", "type": "CONTROL", "containers": [{ "controlType": "TRUE", "nodes": ["P_001"] }],
                  "goals": { "goals": [{ "nodeId": "L_009", "value": 3.0, "range": "UPPER" }] } } }
            ]
        }] }"#,
    )
    .unwrap();

    let result = generate_control_plane(&path, Box::new(LoopbackTransmitter::new()), Arc::new(MockClock::new(0)));
    assert!(matches!(result, Err(Error::UnknownNode(node_id)) if node_id == NodeId::new("L_009")));
}
