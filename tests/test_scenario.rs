mod common;

use common::field;
use field_control_plane::domain::control_model::command::command_types::ControlType;
use field_control_plane::domain::control_model::command::complex_command::ComplexCommandRequest;
use field_control_plane::domain::control_model::command::goal_spec::{GoalDefinition, GoalRange, GoalSpec};
use field_control_plane::domain::control_model::command_manager::control_mode::ControlMode;
use field_control_plane::domain::control_model::node::node::NodeValue;
use field_control_plane::domain::control_model::scenario::scenario_node::ScenarioEntry;
use field_control_plane::domain::control_model::scenario::scenario_runner::ScenarioStatus;
use field_control_plane::domain::control_model::utils::id::ScenarioId;

fn switch_on(id: &str, node: &str) -> ScenarioEntry {
    ScenarioEntry::step(ComplexCommandRequest::control(id).with_container(ControlType::True, None, &[node]))
}

fn issued_ids(dispatches: &[field_control_plane::domain::control_model::command_manager::transmitter::ElementDispatch]) -> Vec<String> {
    dispatches.iter().map(|dispatch| dispatch.owner.wrap_cmd_id.to_string()).collect()
}

#[test]
fn test_scenario_runs_sync_async_sync() {
    let mut field = field(ControlMode::Automatic);
    let entries = vec![
        switch_on("A", "G_001"),
        ScenarioEntry::Group(vec![switch_on("B", "P_001"), switch_on("C", "V_002")]),
        ScenarioEntry::step(ComplexCommandRequest::control("D").with_container(ControlType::False, None, &["G_001"])),
    ];

    let run = field.plane.start_scenario(ScenarioId::new("irrigation"), &entries);
    assert_eq!(issued_ids(&field.execute_all()), vec!["A"]);

    let mut b_and_c = issued_ids(&field.execute_all());
    b_and_c.sort();
    assert_eq!(b_and_c, vec!["B", "C"]);
    assert_eq!(field.plane.scenario_status(run), Some(&ScenarioStatus::Running));

    assert_eq!(issued_ids(&field.execute_all()), vec!["D"]);
    assert_eq!(field.plane.scenario_status(run), Some(&ScenarioStatus::Completed));

    assert_eq!(field.plane.forget_scenario(run), Some(ScenarioStatus::Completed));
    assert_eq!(field.plane.scenario_status(run), None);
}

#[test]
fn test_step_waits_for_goals_of_its_command() {
    let mut field = field(ControlMode::Automatic);
    let fill = ComplexCommandRequest::control("fill")
        .with_container(ControlType::True, None, &["P_001"])
        .with_goals(GoalSpec::new(vec![GoalDefinition::new("L_001", NodeValue::Number(5.0), GoalRange::Upper)], None));
    let entries = vec![ScenarioEntry::step(fill), switch_on("open", "G_001")];

    let run = field.plane.start_scenario(ScenarioId::new("fill_then_open"), &entries);
    field.execute_all();
    assert!(field.execute_all().is_empty());

    field.update("L_001", 5.5);
    assert_eq!(issued_ids(&field.execute_all()), vec!["open"]);
    assert_eq!(field.plane.scenario_status(run), Some(&ScenarioStatus::Completed));
}

#[test]
fn test_delayed_step_follows_clock() {
    let mut field = field(ControlMode::Automatic);
    let delayed = ScenarioEntry::delayed_step(ComplexCommandRequest::control("late").with_container(ControlType::True, None, &["P_001"]), 10);

    let run = field.plane.start_scenario(ScenarioId::new("delay"), &[delayed]);
    assert!(field.execute_all().is_empty());

    field.clock.advance_s(9);
    field.plane.tick();
    assert!(field.execute_all().is_empty());

    field.clock.advance_s(1);
    field.plane.tick();
    assert_eq!(issued_ids(&field.execute_all()), vec!["late"]);
    assert_eq!(field.plane.scenario_status(run), Some(&ScenarioStatus::Completed));
}

#[test]
fn test_redundant_step_completes_without_transmission() {
    let mut field = field(ControlMode::Automatic);
    // V_001 already reports Open.
    let entries = vec![switch_on("noop", "V_001"), switch_on("pump", "P_001")];

    let run = field.plane.start_scenario(ScenarioId::new("noop"), &entries);
    assert_eq!(issued_ids(&field.execute_all()), vec!["pump"]);
    assert_eq!(field.plane.scenario_status(run), Some(&ScenarioStatus::Completed));
}

#[test]
fn test_rejected_step_fails_scenario() {
    let mut field = field(ControlMode::Automatic);
    let entries = vec![switch_on("ghost", "X_001"), switch_on("pump", "P_001")];

    let run = field.plane.start_scenario(ScenarioId::new("broken"), &entries);

    assert!(matches!(field.plane.scenario_status(run), Some(ScenarioStatus::Failed(reason)) if reason.contains("X_001")));
    assert!(field.execute_all().is_empty());
}

#[test]
fn test_cancelled_scenario_stops_before_next_step() {
    let mut field = field(ControlMode::Automatic);
    let entries = vec![switch_on("first", "P_001"), switch_on("second", "G_001")];

    let run = field.plane.start_scenario(ScenarioId::new("stoppable"), &entries);
    assert!(field.plane.cancel_scenario(run));

    assert_eq!(issued_ids(&field.execute_all()), vec!["first"]);
    assert!(field.execute_all().is_empty());
    assert_eq!(field.plane.scenario_status(run), Some(&ScenarioStatus::Cancelled));
    assert_eq!(field.plane.running_scenarios(), 0);
}

#[test]
fn test_step_with_empty_goal_list_does_not_stall() {
    let mut field = field(ControlMode::Automatic);
    let pump = ComplexCommandRequest::control("pump").with_container(ControlType::True, None, &["P_001"]).with_goals(GoalSpec::new(Vec::new(), None));
    let entries = vec![ScenarioEntry::step(pump), switch_on("open", "G_001")];

    let run = field.plane.start_scenario(ScenarioId::new("empty_goals"), &entries);
    assert_eq!(issued_ids(&field.execute_all()), vec!["pump"]);
    assert_eq!(issued_ids(&field.execute_all()), vec!["open"]);

    assert_eq!(field.plane.scenario_status(run), Some(&ScenarioStatus::Completed));
    assert_eq!(field.plane.command_manager().active_count(), 0);
}
