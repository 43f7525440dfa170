use std::collections::HashMap;

use crate::domain::clock::clock::SharedClock;
use crate::domain::control_model::audit::audit_recorder::{AUDIT_TARGET, AuditEvent, AuditRecord, AuditRecorder};
use crate::domain::control_model::command::command_types::{WrapCommandRef, WrapCommandType};
use crate::domain::control_model::command::complex_command::{ComplexCommand, ComplexCommandRequest};
use crate::domain::control_model::command_manager::command_manager::{Acknowledgement, CommandFinish, CommandManager, SubmitOutcome};
use crate::domain::control_model::command_manager::control_mode::{ControlContext, ControlMode};
use crate::domain::control_model::command_manager::transmitter::{DeviceTransmitter, TransmitOutcome};
use crate::domain::control_model::critical::critical_group::Achievement;
use crate::domain::control_model::critical::critical_manager::CriticalManager;
use crate::domain::control_model::dispatch::observer_hub::{ControlObserver, ObserverHub, ObserverId};
use crate::domain::control_model::node::node::{DeviceStatus, NodeValue};
use crate::domain::control_model::node::node_registry::NodeRegistry;
use crate::domain::control_model::plane_config::ControlPlaneConfig;
use crate::domain::control_model::scenario::scenario_node::ScenarioEntry;
use crate::domain::control_model::scenario::scenario_runner::{CommandIssuer, ScenarioRunId, ScenarioRunner, ScenarioStatus};
use crate::domain::control_model::utils::id::{CommandUuid, NodeId, ScenarioId};
use crate::error::{CommandError, Error, Result};

/// Single entry point of the control core.
///
/// Command sources submit and cancel wrap commands, the device layer reports node values and
/// transmission results, and the owner's event loop calls [`ControlPlane::tick`]. Every call runs
/// to completion on the caller's thread.
#[derive(Debug)]
pub struct ControlPlane {
    registry: NodeRegistry,
    context: ControlContext,
    command_manager: CommandManager,
    critical_manager: CriticalManager,
    scenario_runner: ScenarioRunner,
    observers: ObserverHub,
    clock: SharedClock,
    audit: Option<AuditRecorder>,

    /// Scenarios known by name, from configuration.
    scenarios: HashMap<ScenarioId, Vec<ScenarioEntry>>,
}

/// Submission path shared by command sources, scenario steps and CANCEL follow-ups.
struct PlaneIssuer<'a> {
    context: &'a ControlContext,
    registry: &'a NodeRegistry,
    command_manager: &'a mut CommandManager,
    critical_manager: &'a mut CriticalManager,
    audit: Option<&'a AuditRecorder>,
    now_ms: i64,
}

impl PlaneIssuer<'_> {
    fn record(&self, event: AuditEvent, wrap_ref: &WrapCommandRef, detail: Option<String>) {
        if let Some(audit) = self.audit {
            let record = AuditRecord::command(self.now_ms, event, wrap_ref, self.context.mode);
            audit.record(match detail {
                Some(detail) => record.with_detail(detail),
                None => record,
            });
        }
    }
}

impl CommandIssuer for PlaneIssuer<'_> {
    fn issue(&mut self, request: &ComplexCommandRequest) -> std::result::Result<SubmitOutcome, CommandError> {
        let command = ComplexCommand::from_request(request.clone(), self.now_ms);

        match self.command_manager.submit(self.context, self.registry, command) {
            Ok(SubmitOutcome::Accepted(wrap_ref)) => {
                if let Some(command) = self.command_manager.find_command_by_id(&wrap_ref) {
                    self.critical_manager.register_group(command, self.now_ms);
                }
                tracing::info!(target: AUDIT_TARGET, command = %wrap_ref, mode = self.context.mode.as_str(), "command accepted");
                self.record(AuditEvent::Submitted, &wrap_ref, None);
                Ok(SubmitOutcome::Accepted(wrap_ref))
            }
            Ok(SubmitOutcome::NoOp(wrap_ref)) => {
                tracing::info!(target: AUDIT_TARGET, command = %wrap_ref, "command had nothing to transmit");
                self.record(AuditEvent::NoOp, &wrap_ref, None);
                Ok(SubmitOutcome::NoOp(wrap_ref))
            }
            Err(err) => {
                let wrap_ref = request.wrap_ref();
                log::warn!("Command {} rejected: {}", wrap_ref, err);
                tracing::warn!(target: AUDIT_TARGET, command = %wrap_ref, error = %err, "command rejected");
                self.record(AuditEvent::Rejected, &wrap_ref, Some(err.to_string()));
                Err(err)
            }
        }
    }
}

impl ControlPlane {
    pub fn new(registry: NodeRegistry, transmitter: Box<dyn DeviceTransmitter>, clock: SharedClock, mode: ControlMode) -> Self {
        let command_manager = CommandManager::new(&registry, transmitter);
        log::info!("Control plane created with {} nodes in {} mode.", registry.len(), mode.as_str());

        ControlPlane {
            registry,
            context: ControlContext::new(mode),
            command_manager,
            critical_manager: CriticalManager::new(),
            scenario_runner: ScenarioRunner::new(),
            observers: ObserverHub::new(),
            clock,
            audit: None,
            scenarios: HashMap::new(),
        }
    }

    pub fn from_config(config: ControlPlaneConfig, transmitter: Box<dyn DeviceTransmitter>, clock: SharedClock) -> Result<Self> {
        let registry = NodeRegistry::from_nodes(config.nodes)?;

        for (scenario_id, entries) in &config.scenarios {
            let unknown = entries
                .iter()
                .flat_map(ScenarioEntry::requests)
                .flat_map(ComplexCommandRequest::referenced_node_ids)
                .find(|node_id| !registry.contains(node_id));

            if let Some(node_id) = unknown {
                log::error!("Scenario {} references node {}, which is not configured.", scenario_id, node_id);
                return Err(Error::UnknownNode(node_id.clone()));
            }
            log::debug!("Scenario {} configured with {} top-level entries.", scenario_id, entries.len());
        }

        let mut plane = ControlPlane::new(registry, transmitter, clock, config.control_mode);
        plane.scenarios = config.scenarios;
        Ok(plane)
    }

    pub fn with_audit(mut self, audit: AuditRecorder) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Submits a wrap command on behalf of a command source.
    pub fn submit_complex_command(&mut self, request: ComplexCommandRequest) -> std::result::Result<SubmitOutcome, CommandError> {
        let (_, mut issuer) = self.split();
        issuer.issue(&request)
    }

    /// Cancels an active command. SET and FLOW control commands are undone by a CANCEL command.
    pub fn cancel_complex_command(&mut self, wrap_ref: &WrapCommandRef) -> std::result::Result<ComplexCommand, CommandError> {
        self.release_command(wrap_ref, CommandFinish::Cancelled)
    }

    /// Device-layer entry point for a new node value.
    ///
    /// The value is stored first, then observers and goals see it.
    ///
    /// # Returns
    /// The goal groups this update achieved. Their commands are already released.
    pub fn on_node_update(&mut self, node_id: &NodeId, value: NodeValue) -> Result<Vec<Achievement>> {
        let node = self.registry.apply_update(node_id, Some(value.clone()))?;
        log::debug!("Node {} reports {}.", node_id, value);
        self.observers.notify_node(node);

        let achievements = self.critical_manager.on_node_update(node_id, &value);
        self.release_achieved(&achievements);
        Ok(achievements)
    }

    /// Device-layer entry point for a fault or a recovered device.
    pub fn on_node_status(&mut self, node_id: &NodeId, status: DeviceStatus) -> Result<()> {
        let node = self.registry.apply_status(node_id, status)?;
        self.observers.notify_node(node);
        Ok(())
    }

    /// Device-layer entry point for the result of one element transmission.
    ///
    /// # Returns
    /// `None` for UUIDs no active command is waiting for.
    pub fn on_transmit_result(&mut self, command_uuid: &CommandUuid, outcome: TransmitOutcome) -> Option<Acknowledgement> {
        let acknowledgement = self.command_manager.acknowledge(command_uuid, outcome)?;

        if let Some((command, finish)) = &acknowledgement.finished {
            self.critical_manager.drop_group(&acknowledgement.wrap_ref);
            self.after_finish(command, finish.clone(), None);
        }
        Some(acknowledgement)
    }

    pub fn set_control_mode(&mut self, mode: ControlMode) {
        if self.context.mode == mode {
            return;
        }
        log::info!("Control mode changed {} -> {}.", self.context.mode.as_str(), mode.as_str());
        self.context.mode = mode;
        self.observers.notify_mode(mode);
    }

    /// Fires due goal timeouts and scenario delays.
    pub fn tick(&mut self) {
        let now_ms = self.clock.now_ms();

        let achievements = self.critical_manager.on_tick(now_ms);
        self.release_achieved(&achievements);

        let (runner, mut issuer) = self.split();
        runner.on_tick(&mut issuer, now_ms);
        self.collect_scenario_reports();
    }

    pub fn start_scenario(&mut self, scenario_id: ScenarioId, entries: &[ScenarioEntry]) -> ScenarioRunId {
        let now_ms = self.clock.now_ms();
        let (runner, mut issuer) = self.split();
        let run = runner.start(&mut issuer, scenario_id, entries, now_ms);
        self.collect_scenario_reports();
        run
    }

    pub fn start_configured_scenario(&mut self, scenario_id: &ScenarioId) -> Result<ScenarioRunId> {
        let entries = self.scenarios.get(scenario_id).cloned().ok_or_else(|| Error::UnknownScenario(scenario_id.clone()))?;
        Ok(self.start_scenario(scenario_id.clone(), &entries))
    }

    pub fn cancel_scenario(&mut self, run: ScenarioRunId) -> bool {
        self.scenario_runner.cancel(run)
    }

    pub fn scenario_status(&self, run: ScenarioRunId) -> Option<&ScenarioStatus> {
        self.scenario_runner.status(run)
    }

    /// Drops the kept status of a stopped run.
    pub fn forget_scenario(&mut self, run: ScenarioRunId) -> Option<ScenarioStatus> {
        self.scenario_runner.forget(run)
    }

    pub fn add_observer(&mut self, observer: Box<dyn ControlObserver>) -> ObserverId {
        self.observers.add_observer(observer)
    }

    pub fn watch_node(&mut self, observer: ObserverId, node_id: NodeId) -> bool {
        self.observers.watch_node(observer, node_id)
    }

    pub fn remove_observer(&mut self, observer: ObserverId) -> Option<Box<dyn ControlObserver>> {
        self.observers.remove_observer(observer)
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn control_mode(&self) -> ControlMode {
        self.context.mode
    }

    pub fn command_manager(&self) -> &CommandManager {
        &self.command_manager
    }

    pub fn critical_manager(&self) -> &CriticalManager {
        &self.critical_manager
    }

    pub fn configured_scenarios(&self) -> impl Iterator<Item = &ScenarioId> {
        self.scenarios.keys()
    }

    pub fn running_scenarios(&self) -> usize {
        self.scenario_runner.running_count()
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Borrows the scenario runner and the submission path at the same time.
    fn split(&mut self) -> (&mut ScenarioRunner, PlaneIssuer<'_>) {
        let now_ms = self.clock.now_ms();
        (
            &mut self.scenario_runner,
            PlaneIssuer {
                context: &self.context,
                registry: &self.registry,
                command_manager: &mut self.command_manager,
                critical_manager: &mut self.critical_manager,
                audit: self.audit.as_ref(),
                now_ms,
            },
        )
    }

    fn release_achieved(&mut self, achievements: &[Achievement]) {
        for achievement in achievements {
            if let Err(err) = self.release_command(&achievement.owner, CommandFinish::Achieved) {
                log::debug!("Achieved command {} was already released: {}", achievement.owner, err);
            }
        }
    }

    /// Removes an active command and everything hanging off it.
    fn release_command(&mut self, wrap_ref: &WrapCommandRef, finish: CommandFinish) -> std::result::Result<ComplexCommand, CommandError> {
        let command = self.command_manager.cancel(wrap_ref)?;
        self.critical_manager.drop_group(wrap_ref);

        let follow_up = self.issue_cancel_follow_up(&command);
        self.after_finish(&command, finish, follow_up);
        Ok(command)
    }

    /// Submits the CANCEL command undoing a released SET/FLOW control command.
    fn issue_cancel_follow_up(&mut self, command: &ComplexCommand) -> Option<String> {
        if command.wrap_cmd_type != WrapCommandType::Control || !command.wrap_cmd_format.needs_cancel_command() {
            return None;
        }
        let request = ComplexCommandRequest::cancellation_of(command)?;

        let (_, mut issuer) = self.split();
        match issuer.issue(&request) {
            Ok(outcome) => Some(format!("follow-up {}", outcome.wrap_ref())),
            Err(err) => {
                log::warn!("CANCEL follow-up of {} was not admitted: {}", command.wrap_ref(), err);
                None
            }
        }
    }

    /// Audits a finished command and resumes the scenario step waiting for it.
    fn after_finish(&mut self, command: &ComplexCommand, finish: CommandFinish, detail: Option<String>) {
        let wrap_ref = command.wrap_ref();
        let now_ms = self.clock.now_ms();

        let (event, reason) = match &finish {
            CommandFinish::Achieved => (AuditEvent::Achieved, detail),
            CommandFinish::Completed => (AuditEvent::Completed, detail),
            CommandFinish::Cancelled => (AuditEvent::Cancelled, detail),
            CommandFinish::Failed(reason) => (AuditEvent::Failed, Some(reason.clone())),
        };

        log::info!("Command {} finished: {:?}.", wrap_ref, finish);
        tracing::info!(target: AUDIT_TARGET, command = %wrap_ref, finish = ?finish, "command finished");
        if let Some(audit) = &self.audit {
            let mode = command.control_mode_at_creation.unwrap_or(self.context.mode);
            let record = AuditRecord::command(now_ms, event, &wrap_ref, mode);
            audit.record(match reason {
                Some(reason) => record.with_detail(reason),
                None => record,
            });
        }

        let (runner, mut issuer) = self.split();
        runner.on_command_finished(&mut issuer, &wrap_ref, &finish, now_ms);
        self.collect_scenario_reports();
    }

    fn collect_scenario_reports(&mut self) {
        let reports = self.scenario_runner.take_finished();
        let Some(audit) = &self.audit else {
            return;
        };

        let now_ms = self.clock.now_ms();
        for report in reports {
            let detail = match &report.status {
                ScenarioStatus::Failed(reason) => format!("Failed: {}", reason),
                status => status.as_str().to_string(),
            };
            audit.record(AuditRecord::scenario(now_ms, report.scenario_id.as_str(), &detail));
        }
    }
}
