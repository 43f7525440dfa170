use bimap::BiMap;
use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;

use crate::domain::control_model::command::command_types::WrapCommandRef;
use crate::domain::control_model::command::complex_command::ComplexCommandRequest;
use crate::domain::control_model::command_manager::command_manager::{CommandFinish, SubmitOutcome};
use crate::domain::control_model::scenario::scenario_node::{ScenarioEntry, ScenarioNode, ScenarioNodeKey, StepState};
use crate::domain::control_model::scenario::scenario_tree::ScenarioTree;
use crate::domain::control_model::utils::id::ScenarioId;
use crate::domain::control_model::utils::timer_queue::{TimerQueue, deadline_after};
use crate::error::CommandError;

new_key_type! {
    pub struct ScenarioRunId;
}

/// Submission seam used by scenario steps. The control plane implements it on top of its command
/// manager so steps go through the same admission as any other command source.
pub trait CommandIssuer {
    fn issue(&mut self, request: &ComplexCommandRequest) -> Result<SubmitOutcome, CommandError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioStatus {
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioStatus::Running => "Running",
            ScenarioStatus::Completed => "Completed",
            ScenarioStatus::Failed(_) => "Failed",
            ScenarioStatus::Cancelled => "Cancelled",
        }
    }
}

/// A run that stopped during the last call into the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub run: ScenarioRunId,
    pub scenario_id: ScenarioId,
    pub status: ScenarioStatus,
}

/// Position of one step: its run and its node inside the run's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepRef {
    pub run: ScenarioRunId,
    pub node: ScenarioNodeKey,
}

/// What is kept of a run once it stopped. The tree itself is dropped.
#[derive(Debug)]
struct RunOutcome {
    scenario_id: ScenarioId,
    status: ScenarioStatus,
}

#[derive(Debug)]
struct ScenarioRun {
    scenario_id: ScenarioId,
    tree: ScenarioTree,
    status: ScenarioStatus,
    cancel_requested: bool,
}

/// What `execute` decided for a node, acted on once the tree borrow is released.
enum Action {
    Nothing,
    ArmDelay(u64),
    Issue,
    Complete,
    Execute(Vec<ScenarioNodeKey>),
}

/// Drives scenario runs: issues steps, waits for their commands and moves through the groups.
#[derive(Debug, Default)]
pub struct ScenarioRunner {
    /// Running runs only.
    runs: SlotMap<ScenarioRunId, ScenarioRun>,

    /// Final status of stopped runs until the owner forgets them.
    outcomes: HashMap<ScenarioRunId, RunOutcome>,

    /// Issued command of every step still waiting for its command to finish.
    issued: BiMap<WrapCommandRef, StepRef>,

    /// Step delay timers.
    timers: TimerQueue<StepRef>,

    finished: Vec<ScenarioReport>,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self { runs: SlotMap::with_key(), outcomes: HashMap::new(), issued: BiMap::new(), timers: TimerQueue::new(), finished: Vec::new() }
    }

    /// Builds the tree of a scenario and executes its root.
    pub fn start(&mut self, issuer: &mut dyn CommandIssuer, scenario_id: ScenarioId, entries: &[ScenarioEntry], now_ms: i64) -> ScenarioRunId {
        let tree = ScenarioTree::build(entries);
        let root = tree.root();
        let run = self.runs.insert(ScenarioRun { scenario_id: scenario_id.clone(), tree, status: ScenarioStatus::Running, cancel_requested: false });

        log::info!("Scenario {} started as run {:?}.", scenario_id, run);
        self.execute(issuer, run, root, now_ms);
        run
    }

    /// Asks a run to stop. The run stops at its next resumption point (a step command finishing or
    /// a delay elapsing). Commands already issued stay with the command manager.
    ///
    /// # Returns
    /// False if the run is unknown or no longer running.
    pub fn cancel(&mut self, run: ScenarioRunId) -> bool {
        match self.runs.get_mut(run) {
            Some(scenario_run) if scenario_run.status == ScenarioStatus::Running => {
                scenario_run.cancel_requested = true;
                log::info!("Cancellation of scenario {} requested.", scenario_run.scenario_id);
                true
            }
            _ => false,
        }
    }

    /// Resumes the step that issued `wrap_ref`, if any.
    ///
    /// # Returns
    /// False if no scenario step waits for this command.
    pub fn on_command_finished(&mut self, issuer: &mut dyn CommandIssuer, wrap_ref: &WrapCommandRef, finish: &CommandFinish, now_ms: i64) -> bool {
        let Some((_, step_ref)) = self.issued.remove_by_left(wrap_ref) else {
            return false;
        };

        if self.stop_if_cancelled(step_ref.run) {
            return true;
        }

        match finish {
            CommandFinish::Achieved | CommandFinish::Completed => {
                self.set_step_state(step_ref, StepState::Complete);
                self.handle_complete(issuer, step_ref.run, step_ref.node, now_ms);
            }
            CommandFinish::Cancelled => self.handle_failure(step_ref.run, step_ref.node, format!("command {} was cancelled", wrap_ref)),
            CommandFinish::Failed(reason) => self.handle_failure(step_ref.run, step_ref.node, format!("command {} failed: {}", wrap_ref, reason)),
        }
        true
    }

    /// Issues every step whose delay has elapsed.
    pub fn on_tick(&mut self, issuer: &mut dyn CommandIssuer, now_ms: i64) {
        for step_ref in self.timers.pop_due(now_ms) {
            if !self.is_running(step_ref.run) || self.stop_if_cancelled(step_ref.run) {
                continue;
            }
            self.set_step_state(step_ref, StepState::Ready);
            self.issue_step(issuer, step_ref, now_ms);
        }
    }

    pub fn status(&self, run: ScenarioRunId) -> Option<&ScenarioStatus> {
        match self.runs.get(run) {
            Some(scenario_run) => Some(&scenario_run.status),
            None => self.outcomes.get(&run).map(|outcome| &outcome.status),
        }
    }

    pub fn scenario_id(&self, run: ScenarioRunId) -> Option<&ScenarioId> {
        match self.runs.get(run) {
            Some(scenario_run) => Some(&scenario_run.scenario_id),
            None => self.outcomes.get(&run).map(|outcome| &outcome.scenario_id),
        }
    }

    pub fn running_count(&self) -> usize {
        self.runs.len()
    }

    /// Drops the final status of a stopped run. Running runs are kept.
    ///
    /// # Returns
    /// The forgotten status, `None` if the run is unknown or still running.
    pub fn forget(&mut self, run: ScenarioRunId) -> Option<ScenarioStatus> {
        self.outcomes.remove(&run).map(|outcome| outcome.status)
    }

    /// Number of stopped runs whose status is still kept.
    pub fn stopped_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_step_command(&self, wrap_ref: &WrapCommandRef) -> bool {
        self.issued.contains_left(wrap_ref)
    }

    /// Runs that stopped since the last call.
    pub fn take_finished(&mut self) -> Vec<ScenarioReport> {
        std::mem::take(&mut self.finished)
    }

    fn execute(&mut self, issuer: &mut dyn CommandIssuer, run: ScenarioRunId, key: ScenarioNodeKey, now_ms: i64) {
        if !self.is_running(run) {
            return;
        }

        let action = match self.runs.get(run).and_then(|scenario_run| scenario_run.tree.get(key)) {
            Some(ScenarioNode::Step(step)) => match step.state {
                StepState::Idle if step.delay_sec > 0 => Action::ArmDelay(step.delay_sec),
                StepState::Idle | StepState::Ready => Action::Issue,
                // Already issued, delayed or complete.
                _ => Action::Nothing,
            },
            Some(ScenarioNode::Group(group)) if group.is_complete => Action::Nothing,
            Some(ScenarioNode::Group(group)) if group.children.is_empty() => Action::Complete,
            Some(ScenarioNode::Group(group)) if group.is_synchronous => match group.children.get(group.cursor) {
                Some(child) => Action::Execute(vec![*child]),
                None => Action::Nothing,
            },
            Some(ScenarioNode::Group(group)) => Action::Execute(group.children.clone()),
            None => Action::Nothing,
        };

        match action {
            Action::Nothing => {}
            Action::ArmDelay(delay_sec) => {
                let step_ref = StepRef { run, node: key };
                let deadline_ms = deadline_after(now_ms, delay_sec);
                let timer = self.timers.arm(deadline_ms, step_ref);
                self.set_step_state(step_ref, StepState::Waiting(timer));
                log::debug!("Scenario step {:?} waits {} s before issuing.", key, delay_sec);
            }
            Action::Issue => self.issue_step(issuer, StepRef { run, node: key }, now_ms),
            Action::Complete => self.handle_complete(issuer, run, key, now_ms),
            Action::Execute(children) => {
                for child in children {
                    self.execute(issuer, run, child, now_ms);
                }
            }
        }
    }

    fn issue_step(&mut self, issuer: &mut dyn CommandIssuer, step_ref: StepRef, now_ms: i64) {
        let request = match self.runs.get(step_ref.run).and_then(|scenario_run| scenario_run.tree.get(step_ref.node)) {
            Some(ScenarioNode::Step(step)) => step.request.clone(),
            _ => return,
        };

        match issuer.issue(&request) {
            Ok(SubmitOutcome::Accepted(wrap_ref)) => {
                self.set_step_state(step_ref, StepState::Issued(wrap_ref.clone()));
                if let Err((wrap_ref, _)) = self.issued.insert_no_overwrite(wrap_ref, step_ref) {
                    log::warn!("Command {} is already tracked for another scenario step.", wrap_ref);
                }
            }
            Ok(SubmitOutcome::NoOp(wrap_ref)) => {
                log::debug!("Scenario step command {} had nothing to do.", wrap_ref);
                self.set_step_state(step_ref, StepState::Complete);
                self.handle_complete(issuer, step_ref.run, step_ref.node, now_ms);
            }
            Err(err) => self.handle_failure(step_ref.run, step_ref.node, err.to_string()),
        }
    }

    /// Marks `key` complete and moves its parent group forward.
    fn handle_complete(&mut self, issuer: &mut dyn CommandIssuer, run: ScenarioRunId, key: ScenarioNodeKey, now_ms: i64) {
        let Some(scenario_run) = self.runs.get_mut(run) else {
            return;
        };

        let parent = match scenario_run.tree.get_mut(key) {
            Some(ScenarioNode::Group(group)) => {
                if group.is_complete {
                    return;
                }
                group.is_complete = true;
                group.parent
            }
            Some(ScenarioNode::Step(step)) => {
                step.state = StepState::Complete;
                step.parent
            }
            None => return,
        };

        let Some(parent) = parent else {
            self.finish_run(run, ScenarioStatus::Completed);
            return;
        };

        let next = match scenario_run.tree.get_mut(parent) {
            Some(ScenarioNode::Group(group)) if group.is_synchronous => {
                group.cursor += 1;
                match group.children.get(group.cursor) {
                    Some(child) => Action::Execute(vec![*child]),
                    None => Action::Complete,
                }
            }
            Some(ScenarioNode::Group(group)) => {
                group.completed += 1;
                if group.completed >= group.children.len() { Action::Complete } else { Action::Nothing }
            }
            _ => Action::Nothing,
        };

        match next {
            Action::Execute(children) => {
                for child in children {
                    self.execute(issuer, run, child, now_ms);
                }
            }
            Action::Complete => self.handle_complete(issuer, run, parent, now_ms),
            _ => {}
        }
    }

    /// Drops the failed subtree and stops the run. Failed steps are not retried.
    fn handle_failure(&mut self, run: ScenarioRunId, key: ScenarioNodeKey, reason: String) {
        let Some(scenario_run) = self.runs.get_mut(run) else {
            return;
        };

        log::warn!("Scenario {} failed: {}", scenario_run.scenario_id, reason);
        for node in scenario_run.tree.remove_subtree(key) {
            if let ScenarioNode::Step(step) = node {
                match step.state {
                    StepState::Waiting(timer) => {
                        self.timers.cancel(timer);
                    }
                    StepState::Issued(wrap_ref) => {
                        self.issued.remove_by_left(&wrap_ref);
                    }
                    _ => {}
                }
            }
        }
        self.finish_run(run, ScenarioStatus::Failed(reason));
    }

    fn stop_if_cancelled(&mut self, run: ScenarioRunId) -> bool {
        let cancel_requested = self.runs.get(run).is_some_and(|scenario_run| scenario_run.cancel_requested);
        if cancel_requested {
            self.finish_run(run, ScenarioStatus::Cancelled);
        }
        cancel_requested
    }

    /// Records the final status, drops the run's tree and forgets its pending timers and step
    /// commands.
    fn finish_run(&mut self, run: ScenarioRunId, status: ScenarioStatus) {
        let Some(scenario_run) = self.runs.remove(run) else {
            return;
        };

        for (_, step) in scenario_run.tree.steps() {
            match &step.state {
                StepState::Waiting(timer) => {
                    self.timers.cancel(*timer);
                }
                StepState::Issued(wrap_ref) => {
                    self.issued.remove_by_left(wrap_ref);
                }
                _ => {}
            }
        }

        log::info!("Scenario {} finished: {}.", scenario_run.scenario_id, status.as_str());
        tracing::info!(
            target: crate::domain::control_model::audit::audit_recorder::AUDIT_TARGET,
            scenario_id = %scenario_run.scenario_id,
            status = status.as_str(),
            "scenario finished"
        );

        self.outcomes.insert(run, RunOutcome { scenario_id: scenario_run.scenario_id.clone(), status: status.clone() });
        self.finished.push(ScenarioReport { run, scenario_id: scenario_run.scenario_id, status });
    }

    fn set_step_state(&mut self, step_ref: StepRef, state: StepState) {
        if let Some(ScenarioNode::Step(step)) = self.runs.get_mut(step_ref.run).and_then(|scenario_run| scenario_run.tree.get_mut(step_ref.node)) {
            step.state = state;
        }
    }

    fn is_running(&self, run: ScenarioRunId) -> bool {
        self.runs.get(run).is_some_and(|scenario_run| scenario_run.status == ScenarioStatus::Running)
    }
}
