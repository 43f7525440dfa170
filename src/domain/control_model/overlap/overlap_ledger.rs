use std::collections::{HashMap, HashSet};

use crate::domain::control_model::command::command_types::{ControlType, WrapCommandRef};
use crate::domain::control_model::command::complex_command::{ComplexCommand, ContainerCommand};
use crate::domain::control_model::node::node::NodeValue;
use crate::domain::control_model::overlap::overlap_claim::OverlapClaim;
use crate::domain::control_model::utils::id::{CommandUuid, NodeId};
use crate::error::CommandError;

/// Overlap control: who owns driving a node into a state and who else waits on a state.
///
/// Every registered node gets an (initially empty) claim list at construction. Claims are
/// created lazily per (control type, set value) and only ever cleared afterwards.
#[derive(Debug, Default)]
pub struct OverlapLedger {
    claims: HashMap<NodeId, Vec<OverlapClaim>>,
}

impl OverlapLedger {
    pub fn new<'a>(node_ids: impl IntoIterator<Item = &'a NodeId>) -> Self {
        Self { claims: node_ids.into_iter().map(|node_id| (node_id.clone(), Vec::new())).collect() }
    }

    pub fn is_registered(&self, node_id: &NodeId) -> bool {
        self.claims.contains_key(node_id)
    }

    pub fn find_claim(&self, node_id: &NodeId, control_type: ControlType, set_value: Option<&NodeValue>) -> Option<&OverlapClaim> {
        self.claims.get(node_id)?.iter().find(|claim| claim.is_for(control_type, set_value))
    }

    pub fn claims_of(&self, node_id: &NodeId) -> &[OverlapClaim] {
        self.claims.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the claim for the tuple, creating it on first use.
    ///
    /// # Returns
    /// `CommandError::UnknownNode` if the node has no claim storage (was never registered).
    pub fn create_claim(
        &mut self,
        node_id: &NodeId,
        control_type: ControlType,
        set_value: Option<&NodeValue>,
    ) -> Result<&mut OverlapClaim, CommandError> {
        let claims = self.claims.get_mut(node_id).ok_or_else(|| CommandError::UnknownNode(node_id.clone()))?;

        let index = match claims.iter().position(|claim| claim.is_for(control_type, set_value)) {
            Some(index) => index,
            None => {
                claims.push(OverlapClaim::new(control_type, set_value.cloned()));
                claims.len() - 1
            }
        };
        Ok(&mut claims[index])
    }

    /// Records a request of `owner` for every element of `containers`.
    ///
    /// Transmitted elements reserve their claim, all others add `owner` to the pending list.
    /// All nodes are checked before the first claim is touched, so a failed call leaves the
    /// ledger unchanged.
    pub fn record_request(&mut self, owner: &WrapCommandRef, containers: &[ContainerCommand], is_transmitted: bool) -> Result<(), CommandError> {
        if let Some(unknown) = containers.iter().flat_map(|container| &container.elements).find(|element| !self.is_registered(&element.node_id)) {
            return Err(CommandError::UnknownNode(unknown.node_id.clone()));
        }

        for container in containers {
            for element in &container.elements {
                let claim = self.create_claim(&element.node_id, container.control_type, container.set_value.as_ref())?;

                if is_transmitted {
                    let held_by_other = claim.reserving_uuid.as_ref().is_some_and(|holder| holder != &element.command_uuid);

                    if held_by_other {
                        log::warn!(
                            "Claim {:?}/{:?} on node {} is already reserved by {:?}. {} does not take it over.",
                            container.control_type,
                            container.set_value,
                            element.node_id,
                            claim.reserving_uuid,
                            element.command_uuid
                        );
                    } else {
                        claim.reserving_uuid = Some(element.command_uuid.clone());
                    }
                } else if !claim.pending_requests.contains(owner) {
                    claim.pending_requests.push(owner.clone());
                }
            }
        }
        Ok(())
    }

    /// True if another state of the node is still requested by some command.
    pub fn has_conflict(&self, node_id: &NodeId, control_type: ControlType, set_value: Option<&NodeValue>) -> bool {
        self.claims_of(node_id).iter().any(|claim| !claim.is_for(control_type, set_value) && claim.has_pending())
    }

    /// The commands whose pending requests for another state of the node cause a conflict.
    pub fn conflicting_requests(&self, node_id: &NodeId, control_type: ControlType, set_value: Option<&NodeValue>) -> Vec<WrapCommandRef> {
        let mut refs: Vec<WrapCommandRef> = Vec::new();
        for claim in self.claims_of(node_id).iter().filter(|claim| !claim.is_for(control_type, set_value)) {
            for pending in &claim.pending_requests {
                if !refs.contains(pending) {
                    refs.push(pending.clone());
                }
            }
        }
        refs
    }

    /// Drops every trace of `command` from the claims of the nodes it targeted.
    ///
    /// Reservations are only cleared where they still carry one of the command's own element UUIDs.
    pub fn release(&mut self, command: &ComplexCommand) {
        let owner = command.wrap_ref();
        let real_uuids: HashSet<CommandUuid> = command.real_command_uuids().into_iter().collect();

        for node_id in command.target_node_ids() {
            let Some(claims) = self.claims.get_mut(&node_id) else {
                continue;
            };

            for claim in claims.iter_mut() {
                claim.pending_requests.retain(|pending| pending != &owner);

                if claim.reserving_uuid.as_ref().is_some_and(|uuid| real_uuids.contains(uuid)) {
                    claim.reserving_uuid = None;
                }
            }
        }
    }

    /// Number of claims on the node currently holding a reservation.
    pub fn reservation_count(&self, node_id: &NodeId) -> usize {
        self.claims_of(node_id).iter().filter(|claim| claim.is_reserved()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::control_model::command::complex_command::ElementCommand;

    fn ledger() -> OverlapLedger {
        let nodes = [NodeId::new("V_001"), NodeId::new("P_001")];
        OverlapLedger::new(nodes.iter())
    }

    fn container(control_type: ControlType, node: &str) -> ContainerCommand {
        ContainerCommand {
            control_type,
            set_value: None,
            elements: vec![ElementCommand { node_id: NodeId::new(node), command_uuid: CommandUuid::random() }],
        }
    }

    #[test]
    fn test_create_claim_is_idempotent() {
        let mut ledger = ledger();
        let node = NodeId::new("V_001");

        ledger.create_claim(&node, ControlType::True, None).unwrap().pending_requests.push(WrapCommandRef::control("a"));
        let again = ledger.create_claim(&node, ControlType::True, None).unwrap();

        assert_eq!(again.pending_requests.len(), 1);
        assert_eq!(ledger.claims_of(&node).len(), 1);
    }

    #[test]
    fn test_create_claim_on_unregistered_node_fails() {
        let mut ledger = ledger();
        let result = ledger.create_claim(&NodeId::new("X_999"), ControlType::True, None);

        assert!(matches!(result, Err(CommandError::UnknownNode(node)) if node == NodeId::new("X_999")));
    }

    #[test]
    fn test_record_request_separates_pending_and_reservation() {
        let mut ledger = ledger();
        let owner = WrapCommandRef::control("open-v1");
        let containers = vec![container(ControlType::True, "V_001")];

        ledger.record_request(&owner, &containers, false).unwrap();
        ledger.record_request(&owner, &containers, true).unwrap();

        let claim = ledger.find_claim(&NodeId::new("V_001"), ControlType::True, None).unwrap();
        assert_eq!(claim.pending_requests, vec![owner]);
        assert_eq!(claim.reserving_uuid.as_ref(), Some(&containers[0].elements[0].command_uuid));
    }

    #[test]
    fn test_record_request_with_unknown_node_leaves_ledger_untouched() {
        let mut ledger = ledger();
        let owner = WrapCommandRef::control("mixed");
        let containers = vec![container(ControlType::True, "V_001"), container(ControlType::True, "X_404")];

        assert!(ledger.record_request(&owner, &containers, false).is_err());
        assert!(ledger.claims_of(&NodeId::new("V_001")).is_empty());
    }

    #[test]
    fn test_conflict_only_with_other_states_that_are_pending() {
        let mut ledger = ledger();
        let node = NodeId::new("V_001");
        let closer = WrapCommandRef::control("close-v1");

        ledger.record_request(&closer, &[container(ControlType::False, "V_001")], false).unwrap();

        assert!(ledger.has_conflict(&node, ControlType::True, None));
        assert!(!ledger.has_conflict(&node, ControlType::False, None));
        assert!(!ledger.has_conflict(&NodeId::new("P_001"), ControlType::True, None));
        assert_eq!(ledger.conflicting_requests(&node, ControlType::True, None), vec![closer]);
    }
}
