use std::collections::HashMap;

use crate::domain::control_model::node::node::{DeviceStatus, Node, NodeValue};
use crate::domain::control_model::utils::id::NodeId;
use crate::error::{Error, Result};

/// Current value and metadata of every configured node.
///
/// Built once from configuration. Values are only written through [`NodeRegistry::apply_update`],
/// which is reserved for the device-update path of the control plane.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: HashMap<NodeId, Node>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self { nodes: HashMap::new() }
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self> {
        let mut registry = NodeRegistry::new();
        for node in nodes {
            registry.register(node)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(Error::ModelConstructionError(format!("Node {} is configured twice.", node.id)));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn get_node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn apply_update(&mut self, node_id: &NodeId, value: Option<NodeValue>) -> Result<&Node> {
        let node = self.nodes.get_mut(node_id).ok_or_else(|| Error::UnknownNode(node_id.clone()))?;
        node.current_value = value;
        Ok(node)
    }

    pub(crate) fn apply_status(&mut self, node_id: &NodeId, status: DeviceStatus) -> Result<&Node> {
        let node = self.nodes.get_mut(node_id).ok_or_else(|| Error::UnknownNode(node_id.clone()))?;
        if node.status != status {
            log::warn!("Node {} changed device status {:?} -> {:?}.", node_id, node.status, status);
        }
        node.status = status;
        Ok(node)
    }
}
