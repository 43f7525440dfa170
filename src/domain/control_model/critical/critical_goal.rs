use crate::domain::control_model::command::goal_spec::{GoalDefinition, GoalRange};
use crate::domain::control_model::dispatch::update_dispatcher::SubscriptionId;
use crate::domain::control_model::node::node::NodeValue;
use crate::domain::control_model::utils::id::NodeId;

/// One live threshold condition of a [`CriticalGroup`](super::critical_group::CriticalGroup).
///
/// A goal only ever moves from pending to clear. Later updates that leave the range again do not
/// reset it.
#[derive(Debug, Clone)]
pub struct CriticalGoal {
    pub node_id: NodeId,
    pub goal_value: NodeValue,
    pub goal_range: GoalRange,
    pub is_sole_sufficient: bool,
    pub is_clear: bool,

    /// Set while the goal listens to updates of its node.
    pub subscription: Option<SubscriptionId>,
}

impl CriticalGoal {
    pub fn from_definition(definition: &GoalDefinition) -> Self {
        let goal = CriticalGoal {
            node_id: definition.node_id.clone(),
            goal_value: definition.goal_value.clone(),
            goal_range: definition.goal_range,
            is_sole_sufficient: definition.is_sole_sufficient,
            is_clear: false,
            subscription: None,
        };

        if !goal.is_comparable() {
            log::warn!(
                "InvalidGoalComparison: goal on node {} compares text value '{}' with {:?}. The goal can never clear.",
                goal.node_id,
                goal.goal_value,
                goal.goal_range
            );
        }
        goal
    }

    /// Text goals only support EQUAL.
    pub fn is_comparable(&self) -> bool {
        match self.goal_value {
            NodeValue::Number(_) => true,
            NodeValue::Text(_) => self.goal_range == GoalRange::Equal,
        }
    }

    /// True if `value` satisfies the goal.
    pub fn evaluate(&self, value: &NodeValue) -> bool {
        match (value, &self.goal_value) {
            (NodeValue::Number(current), NodeValue::Number(goal)) => match self.goal_range {
                GoalRange::Equal => current == goal,
                GoalRange::Lower => current < goal,
                GoalRange::Upper => current > goal,
            },
            (NodeValue::Text(current), NodeValue::Text(goal)) => {
                self.goal_range == GoalRange::Equal && current.eq_ignore_ascii_case(goal)
            }
            _ => false,
        }
    }

    /// Feeds one node value into the goal.
    ///
    /// # Returns
    /// True only for the update that turned the goal clear.
    pub fn observe(&mut self, value: &NodeValue) -> bool {
        if self.is_clear || !self.evaluate(value) {
            return false;
        }
        self.is_clear = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(value: NodeValue, range: GoalRange) -> CriticalGoal {
        CriticalGoal::from_definition(&GoalDefinition::new("L_001", value, range))
    }

    #[test]
    fn test_numeric_ranges() {
        let upper = goal(NodeValue::Number(3.5), GoalRange::Upper);
        assert!(upper.evaluate(&NodeValue::Number(3.6)));
        assert!(!upper.evaluate(&NodeValue::Number(3.5)));

        let lower = goal(NodeValue::Number(1.0), GoalRange::Lower);
        assert!(lower.evaluate(&NodeValue::Number(0.2)));
        assert!(!lower.evaluate(&NodeValue::Number(1.0)));

        let equal = goal(NodeValue::Number(2.0), GoalRange::Equal);
        assert!(equal.evaluate(&NodeValue::Number(2.0)));
    }

    #[test]
    fn test_text_goal_equal_only() {
        let equal = goal(NodeValue::from("Open"), GoalRange::Equal);
        assert!(equal.evaluate(&NodeValue::from("OPEN")));
        assert!(!equal.evaluate(&NodeValue::Number(1.0)));

        let upper = goal(NodeValue::from("Open"), GoalRange::Upper);
        assert!(!upper.is_comparable());
        assert!(!upper.evaluate(&NodeValue::from("Open")));
    }

    #[test]
    fn test_goal_stays_clear() {
        let mut upper = goal(NodeValue::Number(3.5), GoalRange::Upper);

        assert!(!upper.observe(&NodeValue::Number(3.0)));
        assert!(upper.observe(&NodeValue::Number(4.0)));
        assert!(!upper.observe(&NodeValue::Number(1.0)));
        assert!(upper.is_clear);
    }
}
