use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use field_control_plane::domain::clock::clock::{RealTimeClock, SharedClock};
use field_control_plane::domain::control_model::audit::audit_recorder::AuditRecorder;
use field_control_plane::domain::control_model::command_manager::control_mode::ControlMode;
use field_control_plane::domain::control_model::command_manager::transmitter::TransmitOutcome;
use field_control_plane::domain::control_model::control_plane::ControlPlane;
use field_control_plane::domain::control_model::device::loopback_transmitter::{LoopbackTransmitter, simulated_value};
use field_control_plane::domain::control_model::dispatch::observer_hub::ControlObserver;
use field_control_plane::domain::control_model::node::node::Node;
use field_control_plane::domain::control_model::scenario::scenario_runner::ScenarioStatus;
use field_control_plane::domain::control_model::utils::id::{NodeId, ScenarioId};
use field_control_plane::{load_config, logger};

/// Runs configured scenarios against an in-process loopback device layer.
#[derive(Parser, Debug)]
#[command(name = "field-control-plane", version)]
struct Cli {
    /// Configuration file (nodes, control mode, scenarios).
    #[arg(long, default_value = "src/data/field_network.json")]
    config: PathBuf,

    /// Scenario to run. Runs every configured scenario if omitted.
    #[arg(long)]
    scenario: Option<String>,

    /// Overrides the control mode of the configuration.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Writes command lifecycle events to this CSV file.
    #[arg(long)]
    audit: Option<PathBuf>,

    #[arg(long, default_value_t = 600)]
    max_ticks: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Automatic,
    Manual,
}

impl From<ModeArg> for ControlMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Automatic => ControlMode::Automatic,
            ModeArg::Manual => ControlMode::Manual,
        }
    }
}

#[derive(Debug)]
struct ConsoleObserver;

impl ControlObserver for ConsoleObserver {
    fn on_node_update(&mut self, node: &Node) {
        let value = node.current_value.as_ref().map_or_else(|| "-".to_string(), |value| value.to_string());
        println!("{} {} = {}", "node".cyan(), node.id, value.bold());
    }

    fn on_control_mode_changed(&mut self, mode: ControlMode) {
        println!("{} {}", "mode".magenta(), mode.as_str());
    }
}

/// Plays the field devices: acknowledges every queued dispatch and reports the new value.
fn drive_loopback(plane: &mut ControlPlane, transmitter: &LoopbackTransmitter) -> anyhow::Result<()> {
    for dispatch in transmitter.drain() {
        let value = plane.registry().get_node(&dispatch.node_id).and_then(|node| simulated_value(node, &dispatch));

        plane.on_transmit_result(&dispatch.command_uuid, TransmitOutcome::Delivered);
        if let Some(value) = value {
            plane.on_node_update(&dispatch.node_id, value).with_context(|| format!("applying loopback value of {}", dispatch.node_id))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();
    let cli = Cli::parse();

    let config = load_config(&cli.config).with_context(|| format!("loading {}", cli.config.display()))?;
    let tick_interval = Duration::from_millis(config.tick_interval_ms);

    let transmitter = LoopbackTransmitter::new();
    let clock: SharedClock = Arc::new(RealTimeClock::new());
    let mut plane = ControlPlane::from_config(config, Box::new(transmitter.clone()), clock)?;

    if let Some(path) = &cli.audit {
        plane = plane.with_audit(AuditRecorder::to_file(path).with_context(|| format!("creating audit file {}", path.display()))?);
    }

    let observer = plane.add_observer(Box::new(ConsoleObserver));
    let node_ids: Vec<NodeId> = plane.registry().node_ids().cloned().collect();
    for node_id in node_ids {
        plane.watch_node(observer, node_id);
    }
    if let Some(mode) = cli.mode {
        plane.set_control_mode(mode.into());
    }

    let scenario_ids: Vec<ScenarioId> = match &cli.scenario {
        Some(id) => vec![ScenarioId::new(id.as_str())],
        None => plane.configured_scenarios().cloned().collect(),
    };

    let mut runs = Vec::with_capacity(scenario_ids.len());
    for scenario_id in &scenario_ids {
        let run = plane.start_configured_scenario(scenario_id).with_context(|| format!("starting scenario {}", scenario_id))?;
        runs.push((scenario_id.clone(), run));
    }

    let mut interval = tokio::time::interval(tick_interval);
    for _ in 0..cli.max_ticks {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted, stopping the control loop.");
                break;
            }
        }

        drive_loopback(&mut plane, &transmitter)?;
        plane.tick();

        let all_done = runs.iter().all(|(_, run)| !matches!(plane.scenario_status(*run), Some(ScenarioStatus::Running)));
        if all_done && plane.command_manager().active_count() == 0 {
            break;
        }
    }

    println!();
    for (scenario_id, run) in &runs {
        let status = match plane.scenario_status(*run) {
            Some(ScenarioStatus::Completed) => "Completed".green(),
            Some(ScenarioStatus::Failed(reason)) => format!("Failed: {}", reason).red(),
            Some(ScenarioStatus::Cancelled) => "Cancelled".yellow(),
            Some(ScenarioStatus::Running) => "Still running".yellow(),
            None => "Unknown".red(),
        };
        println!("{} {}: {}", "scenario".blue(), scenario_id, status);
    }
    println!("{} {}", "active commands".blue(), plane.command_manager().active_count());

    Ok(())
}
