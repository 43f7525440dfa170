use crate::domain::control_model::command::command_types::WrapCommandRef;
use crate::domain::control_model::command::goal_spec::GoalSpec;
use crate::domain::control_model::critical::critical_goal::CriticalGoal;
use crate::domain::control_model::utils::timer_queue::TimerId;

/// Release condition of one active command: its goals and the hold timer.
#[derive(Debug, Clone)]
pub struct CriticalGroup {
    pub owner: WrapCommandRef,
    pub children: Vec<CriticalGoal>,
    pub timeout: Option<TimerId>,
}

impl CriticalGroup {
    pub fn new(owner: WrapCommandRef, goal_spec: &GoalSpec) -> Self {
        CriticalGroup { owner, children: goal_spec.goals.iter().map(CriticalGoal::from_definition).collect(), timeout: None }
    }

    /// Checks the group after the goal at `index` turned clear.
    ///
    /// A sole-sufficient goal achieves the group on its own, otherwise every goal must be clear.
    pub fn notify_clear(&self, index: usize) -> Option<AchievementReason> {
        let goal = self.children.get(index)?;
        if goal.is_sole_sufficient {
            return Some(AchievementReason::SoleSufficient);
        }
        self.is_achieved().then_some(AchievementReason::GoalsCleared)
    }

    pub fn is_achieved(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(|goal| goal.is_clear)
    }

    pub fn clear_count(&self) -> usize {
        self.children.iter().filter(|goal| goal.is_clear).count()
    }
}

/// Why a group released its command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementReason {
    GoalsCleared,
    SoleSufficient,
    Timeout,
}

impl AchievementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementReason::GoalsCleared => "GoalsCleared",
            AchievementReason::SoleSufficient => "SoleSufficient",
            AchievementReason::Timeout => "Timeout",
        }
    }
}

/// Achieved group, handed back to the control plane which then releases `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub owner: WrapCommandRef,
    pub reason: AchievementReason,
}
