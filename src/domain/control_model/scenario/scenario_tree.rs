use slotmap::SlotMap;

use crate::domain::control_model::scenario::scenario_node::{
    ScenarioEntry, ScenarioGroup, ScenarioNode, ScenarioNodeKey, ScenarioStep, StepState,
};

/// Arena of one scenario run. Nodes refer to each other through [`ScenarioNodeKey`]s.
#[derive(Debug, Clone)]
pub struct ScenarioTree {
    nodes: SlotMap<ScenarioNodeKey, ScenarioNode>,
    root: ScenarioNodeKey,
}

impl ScenarioTree {
    /// Builds the tree of a scenario.
    ///
    /// The root group is synchronous. Every nested list becomes a child group with the opposite
    /// synchronicity of its parent, so `[A, [B, C], D]` runs A, then B and C together, then D.
    pub fn build(entries: &[ScenarioEntry]) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = Self::insert_group(&mut nodes, None, true, entries);
        ScenarioTree { nodes, root }
    }

    fn insert_group(
        nodes: &mut SlotMap<ScenarioNodeKey, ScenarioNode>,
        parent: Option<ScenarioNodeKey>,
        is_synchronous: bool,
        entries: &[ScenarioEntry],
    ) -> ScenarioNodeKey {
        let key = nodes.insert(ScenarioNode::Group(ScenarioGroup {
            parent,
            is_synchronous,
            children: Vec::with_capacity(entries.len()),
            cursor: 0,
            completed: 0,
            is_complete: false,
        }));

        let children: Vec<ScenarioNodeKey> = entries
            .iter()
            .map(|entry| match entry {
                ScenarioEntry::Step(spec) => nodes.insert(ScenarioNode::Step(ScenarioStep {
                    parent: Some(key),
                    request: spec.request.clone(),
                    delay_sec: spec.delay_sec,
                    state: StepState::Idle,
                })),
                ScenarioEntry::Group(inner) => Self::insert_group(nodes, Some(key), !is_synchronous, inner),
            })
            .collect();

        if let Some(ScenarioNode::Group(group)) = nodes.get_mut(key) {
            group.children = children;
        }
        key
    }

    pub fn root(&self) -> ScenarioNodeKey {
        self.root
    }

    pub fn get(&self, key: ScenarioNodeKey) -> Option<&ScenarioNode> {
        self.nodes.get(key)
    }

    pub fn get_mut(&mut self, key: ScenarioNodeKey) -> Option<&mut ScenarioNode> {
        self.nodes.get_mut(key)
    }

    pub fn contains(&self, key: ScenarioNodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = (ScenarioNodeKey, &ScenarioStep)> {
        self.nodes.iter().filter_map(|(key, node)| match node {
            ScenarioNode::Step(step) => Some((key, step)),
            ScenarioNode::Group(_) => None,
        })
    }

    /// Removes `key` and everything below it, and unlinks it from its parent.
    ///
    /// # Returns
    /// The removed nodes.
    pub fn remove_subtree(&mut self, key: ScenarioNodeKey) -> Vec<ScenarioNode> {
        if let Some(parent) = self.nodes.get(key).and_then(ScenarioNode::parent) {
            if let Some(ScenarioNode::Group(group)) = self.nodes.get_mut(parent) {
                group.children.retain(|child| *child != key);
            }
        }

        let mut removed = Vec::new();
        let mut stack = vec![key];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                if let ScenarioNode::Group(group) = &node {
                    stack.extend(group.children.iter().copied());
                }
                removed.push(node);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::control_model::command::complex_command::ComplexCommandRequest;

    fn step(id: &str) -> ScenarioEntry {
        ScenarioEntry::step(ComplexCommandRequest::control(id))
    }

    fn group(tree: &ScenarioTree, key: ScenarioNodeKey) -> &ScenarioGroup {
        match tree.get(key) {
            Some(ScenarioNode::Group(group)) => group,
            other => panic!("expected a group, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_groups_flip_synchronicity() {
        let tree = ScenarioTree::build(&[step("A"), ScenarioEntry::Group(vec![step("B"), ScenarioEntry::Group(vec![step("C")])]), step("D")]);

        let root = group(&tree, tree.root());
        assert!(root.is_synchronous);
        assert_eq!(root.children.len(), 3);

        let inner = group(&tree, root.children[1]);
        assert!(!inner.is_synchronous);

        let innermost = group(&tree, inner.children[1]);
        assert!(innermost.is_synchronous);
        assert_eq!(tree.steps().count(), 4);
    }

    #[test]
    fn test_remove_subtree_unlinks_from_parent() {
        let mut tree = ScenarioTree::build(&[step("A"), ScenarioEntry::Group(vec![step("B"), step("C")])]);
        let inner = group(&tree, tree.root()).children[1];

        let removed = tree.remove_subtree(inner);

        assert_eq!(removed.len(), 3);
        assert_eq!(group(&tree, tree.root()).children.len(), 1);
        assert_eq!(tree.len(), 2);
    }
}
