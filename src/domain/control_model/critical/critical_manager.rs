use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;

use crate::domain::control_model::command::command_types::WrapCommandRef;
use crate::domain::control_model::command::complex_command::ComplexCommand;
use crate::domain::control_model::critical::critical_group::{Achievement, AchievementReason, CriticalGroup};
use crate::domain::control_model::dispatch::update_dispatcher::UpdateDispatcher;
use crate::domain::control_model::node::node::NodeValue;
use crate::domain::control_model::utils::id::NodeId;
use crate::domain::control_model::utils::timer_queue::{TimerQueue, deadline_after};

new_key_type! {
    pub struct CriticalGroupKey;
}

/// Position of one goal: its group and the index among the group's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalRef {
    pub group: CriticalGroupKey,
    pub index: usize,
}

/// Watches the goals of active commands and reports when a command may be released.
#[derive(Debug, Default)]
pub struct CriticalManager {
    groups: SlotMap<CriticalGroupKey, CriticalGroup>,
    by_owner: HashMap<WrapCommandRef, CriticalGroupKey>,
    goal_updates: UpdateDispatcher<GoalRef>,
    timeouts: TimerQueue<CriticalGroupKey>,
}

impl CriticalManager {
    pub fn new() -> Self {
        Self { groups: SlotMap::with_key(), by_owner: HashMap::new(), goal_updates: UpdateDispatcher::new(), timeouts: TimerQueue::new() }
    }

    /// Builds the group of an accepted command and subscribes its goals.
    ///
    /// Commands without goal spec get no group. Goals are judged on the next update of their
    /// node, not against the value the node holds right now.
    ///
    /// # Returns
    /// The key of the new group, `None` if the command has no goal spec or already owns a group.
    pub fn register_group(&mut self, command: &ComplexCommand, now_ms: i64) -> Option<CriticalGroupKey> {
        let goal_spec = command.goal_spec.as_ref().filter(|spec| !spec.is_empty())?;
        let owner = command.wrap_ref();

        if self.by_owner.contains_key(&owner) {
            log::warn!("Command {} already owns a critical group. Keeping the existing one.", owner);
            return None;
        }

        let key = self.groups.insert(CriticalGroup::new(owner.clone(), goal_spec));

        if let Some(group) = self.groups.get_mut(key) {
            for (index, goal) in group.children.iter_mut().enumerate() {
                goal.subscription = Some(self.goal_updates.subscribe(goal.node_id.clone(), GoalRef { group: key, index }));
            }

            if let Some(timeout_sec) = goal_spec.timeout_sec {
                let deadline_ms = deadline_after(now_ms, timeout_sec);
                group.timeout = Some(self.timeouts.arm(deadline_ms, key));
            }

            log::debug!("Registered critical group of {} with {} goals (timeout {:?} s).", owner, group.children.len(), goal_spec.timeout_sec);
        }

        self.by_owner.insert(owner, key);
        Some(key)
    }

    /// Delivers a new node value to the goals watching the node, in subscription order.
    ///
    /// # Returns
    /// Every group achieved by this update. Their goals are already unsubscribed.
    pub fn on_node_update(&mut self, node_id: &NodeId, value: &NodeValue) -> Vec<Achievement> {
        let mut achievements = Vec::new();

        for (subscription, goal_ref) in self.goal_updates.snapshot(node_id) {
            // An earlier goal in this snapshot may have achieved and removed the group.
            if !self.goal_updates.is_subscribed(subscription) {
                continue;
            }
            let Some(group) = self.groups.get_mut(goal_ref.group) else {
                continue;
            };
            let Some(goal) = group.children.get_mut(goal_ref.index) else {
                continue;
            };

            if !goal.observe(value) {
                continue;
            }
            log::debug!("Goal {} of {} on node {} is clear.", goal_ref.index, group.owner, node_id);

            if let Some(reason) = group.notify_clear(goal_ref.index) {
                if let Some(achievement) = self.finish_group(goal_ref.group, reason) {
                    achievements.push(achievement);
                }
            }
        }
        achievements
    }

    /// Forces achievement of every group whose hold timer ran out.
    pub fn on_tick(&mut self, now_ms: i64) -> Vec<Achievement> {
        self.timeouts
            .pop_due(now_ms)
            .into_iter()
            .filter_map(|key| {
                if let Some(group) = self.groups.get_mut(key) {
                    // The timer already fired, nothing left to cancel.
                    group.timeout = None;
                }
                self.finish_group(key, AchievementReason::Timeout)
            })
            .collect()
    }

    /// Tears down the group of a command that was released from elsewhere.
    pub fn drop_group(&mut self, owner: &WrapCommandRef) -> bool {
        let Some(key) = self.by_owner.get(owner).copied() else {
            return false;
        };
        self.remove_group(key).is_some()
    }

    pub fn group_for(&self, owner: &WrapCommandRef) -> Option<&CriticalGroup> {
        self.by_owner.get(owner).and_then(|key| self.groups.get(*key))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn next_deadline(&self) -> Option<i64> {
        self.timeouts.next_deadline()
    }

    fn finish_group(&mut self, key: CriticalGroupKey, reason: AchievementReason) -> Option<Achievement> {
        let group = self.remove_group(key)?;
        log::info!("Critical group of {} achieved ({}, {}/{} goals clear).", group.owner, reason.as_str(), group.clear_count(), group.children.len());
        Some(Achievement { owner: group.owner, reason })
    }

    fn remove_group(&mut self, key: CriticalGroupKey) -> Option<CriticalGroup> {
        let group = self.groups.remove(key)?;
        self.by_owner.remove(&group.owner);

        if let Some(timer) = group.timeout {
            self.timeouts.cancel(timer);
        }
        for goal in &group.children {
            if let Some(subscription) = goal.subscription {
                self.goal_updates.unsubscribe(subscription);
            }
        }
        Some(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::control_model::command::command_types::ControlType;
    use crate::domain::control_model::command::complex_command::ComplexCommandRequest;
    use crate::domain::control_model::command::goal_spec::{GoalDefinition, GoalRange, GoalSpec};
    use rand::seq::SliceRandom;

    fn pump_with_goals(id: &str, goals: Vec<GoalDefinition>, timeout_sec: Option<u64>) -> ComplexCommand {
        let request = ComplexCommandRequest::control(id)
            .with_container(ControlType::True, None, &["P_001"])
            .with_goals(GoalSpec::new(goals, timeout_sec));
        ComplexCommand::from_request(request, 0)
    }

    fn level_goals() -> Vec<GoalDefinition> {
        vec![
            GoalDefinition::new("L_001", NodeValue::Number(3.5), GoalRange::Upper),
            GoalDefinition::new("L_002", NodeValue::Number(1.0), GoalRange::Lower),
            GoalDefinition::new("G_001", NodeValue::from("Open"), GoalRange::Equal),
        ]
    }

    fn satisfying_updates() -> Vec<(NodeId, NodeValue)> {
        vec![
            (NodeId::new("L_001"), NodeValue::Number(3.8)),
            (NodeId::new("L_002"), NodeValue::Number(0.4)),
            (NodeId::new("G_001"), NodeValue::from("open")),
        ]
    }

    #[test]
    fn test_all_goals_needed_without_sole_sufficient() {
        let mut manager = CriticalManager::new();
        let command = pump_with_goals("fill", level_goals(), None);
        manager.register_group(&command, 0);

        let updates = satisfying_updates();
        assert!(manager.on_node_update(&updates[0].0, &updates[0].1).is_empty());
        assert!(manager.on_node_update(&updates[1].0, &updates[1].1).is_empty());

        let achieved = manager.on_node_update(&updates[2].0, &updates[2].1);
        assert_eq!(achieved, vec![Achievement { owner: command.wrap_ref(), reason: AchievementReason::GoalsCleared }]);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_achievement_is_order_independent() {
        let mut rng = rand::rng();

        for _ in 0..20 {
            let mut manager = CriticalManager::new();
            let command = pump_with_goals("fill", level_goals(), None);
            manager.register_group(&command, 0);

            let mut updates = satisfying_updates();
            updates.shuffle(&mut rng);

            let achieved: Vec<Achievement> = updates.iter().flat_map(|(node_id, value)| manager.on_node_update(node_id, value)).collect();
            assert_eq!(achieved.len(), 1);
            assert_eq!(achieved[0].reason, AchievementReason::GoalsCleared);
        }
    }

    #[test]
    fn test_cleared_goal_ignores_later_updates() {
        let mut manager = CriticalManager::new();
        let command = pump_with_goals("fill", level_goals(), None);
        manager.register_group(&command, 0);

        manager.on_node_update(&NodeId::new("L_001"), &NodeValue::Number(4.0));
        manager.on_node_update(&NodeId::new("L_001"), &NodeValue::Number(0.0));

        let group = manager.group_for(&command.wrap_ref()).expect("group is still waiting");
        assert!(group.children[0].is_clear);
        assert_eq!(group.clear_count(), 1);
    }

    #[test]
    fn test_sole_sufficient_goal_achieves_alone() {
        let mut manager = CriticalManager::new();
        let mut goals = level_goals();
        goals[1] = goals[1].clone().sole_sufficient();
        let command = pump_with_goals("fill", goals, None);
        manager.register_group(&command, 0);

        let achieved = manager.on_node_update(&NodeId::new("L_002"), &NodeValue::Number(0.5));
        assert_eq!(achieved[0].reason, AchievementReason::SoleSufficient);
        assert!(manager.on_node_update(&NodeId::new("L_001"), &NodeValue::Number(5.0)).is_empty());
    }

    #[test]
    fn test_timeout_forces_achievement_exactly_once() {
        let mut manager = CriticalManager::new();
        let command = pump_with_goals("fill", level_goals(), Some(30));
        manager.register_group(&command, 1_000);

        assert!(manager.on_tick(30_999).is_empty());

        let achieved = manager.on_tick(31_000);
        assert_eq!(achieved, vec![Achievement { owner: command.wrap_ref(), reason: AchievementReason::Timeout }]);
        assert!(manager.on_tick(60_000).is_empty());
        assert!(manager.on_node_update(&NodeId::new("L_001"), &NodeValue::Number(5.0)).is_empty());
    }

    #[test]
    fn test_achievement_cancels_timeout() {
        let mut manager = CriticalManager::new();
        let goals = vec![GoalDefinition::new("L_001", NodeValue::Number(3.5), GoalRange::Upper)];
        let command = pump_with_goals("fill", goals, Some(10));
        manager.register_group(&command, 0);

        assert_eq!(manager.on_node_update(&NodeId::new("L_001"), &NodeValue::Number(4.0)).len(), 1);
        assert_eq!(manager.next_deadline(), None);
        assert!(manager.on_tick(20_000).is_empty());
    }

    #[test]
    fn test_two_groups_on_one_node_both_achieve() {
        let mut manager = CriticalManager::new();
        let goal = || vec![GoalDefinition::new("L_001", NodeValue::Number(2.0), GoalRange::Upper)];
        manager.register_group(&pump_with_goals("first", goal(), None), 0);
        manager.register_group(&pump_with_goals("second", goal(), None), 0);

        let owners: Vec<String> =
            manager.on_node_update(&NodeId::new("L_001"), &NodeValue::Number(2.5)).into_iter().map(|a| a.owner.wrap_cmd_id.to_string()).collect();
        assert_eq!(owners, vec!["first", "second"]);
    }

    #[test]
    fn test_drop_group_unsubscribes() {
        let mut manager = CriticalManager::new();
        let command = pump_with_goals("fill", level_goals(), Some(5));
        manager.register_group(&command, 0);

        assert!(manager.drop_group(&command.wrap_ref()));
        assert!(!manager.drop_group(&command.wrap_ref()));
        assert!(manager.on_tick(10_000).is_empty());
        assert!(manager.on_node_update(&NodeId::new("L_001"), &NodeValue::Number(5.0)).is_empty());
    }

    #[test]
    fn test_command_without_goals_gets_no_group() {
        let mut manager = CriticalManager::new();
        let request = ComplexCommandRequest::control("plain").with_container(ControlType::True, None, &["P_001"]);
        assert!(manager.register_group(&ComplexCommand::from_request(request, 0), 0).is_none());
    }

    #[test]
    fn test_empty_goal_spec_gets_no_group() {
        let mut manager = CriticalManager::new();
        let mut command = pump_with_goals("plain", Vec::new(), None);
        assert!(command.goal_spec.is_none());

        command.goal_spec = Some(GoalSpec::new(Vec::new(), None));
        assert!(manager.register_group(&command, 0).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_huge_timeout_does_not_wrap_into_the_past() {
        let mut manager = CriticalManager::new();
        let command = pump_with_goals("hold", level_goals(), Some(u64::MAX));
        manager.register_group(&command, 1_000);

        assert!(manager.on_tick(1_000).is_empty());
        assert!(manager.on_tick(1_000_000_000_000).is_empty());
        assert_eq!(manager.len(), 1);
    }
}
