use std::collections::BTreeMap;

use ahash::HashSet;
use itertools::Itertools;
use tracing::{debug, trace};

use actor_core::actor::address::UniqueAddress;

use crate::member::{Member, MemberStatus};
use crate::membership_event::MembershipEvent;

/// One node's local record of the cluster. `generation` grows by one on every event that
/// changed the view and never otherwise.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MembershipView {
    members: BTreeMap<UniqueAddress, Member>,
    ceded: HashSet<UniqueAddress>,
    generation: u64,
}

impl MembershipView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn members(&self) -> impl Iterator<Item=&Member> {
        self.members.values()
    }

    pub fn member(&self, node: &UniqueAddress) -> Option<&Member> {
        self.members.get(node)
    }

    pub fn contains(&self, node: &UniqueAddress) -> bool {
        self.members.contains_key(node)
    }

    pub fn is_ceded(&self, node: &UniqueAddress) -> bool {
        self.ceded.contains(node)
    }

    /// A node is gone when it was removed from the view or is Down or Exiting.
    /// Unreachable nodes are not gone, they may still host a singleton.
    pub fn is_gone(&self, node: &UniqueAddress) -> bool {
        self.members.get(node).map(|m| m.is_gone()).unwrap_or(true)
    }

    pub fn apply(&mut self, event: &MembershipEvent) -> u64 {
        if self.mutate(event) {
            self.generation += 1;
            debug!("membership view apply {}, generation {}", event, self.generation);
        } else {
            trace!("membership view ignore {}, generation {}", event, self.generation);
        }
        self.generation
    }

    fn mutate(&mut self, event: &MembershipEvent) -> bool {
        match event {
            MembershipEvent::NodeJoined { node, roles } => {
                if self.members.contains_key(node) {
                    return false;
                }
                for member in self.members.values_mut() {
                    if member.unique_address.address == node.address && member.unique_address.uid != node.uid {
                        debug!("{} restarted as {}, mark previous incarnation down", member.unique_address, node);
                        member.advance(MemberStatus::Down);
                    }
                }
                let member = Member::new(node.clone(), MemberStatus::Joining, roles.clone());
                self.members.insert(node.clone(), member);
                true
            }
            MembershipEvent::NodeUp { node, up_number } => {
                match self.members.get_mut(node) {
                    Some(member) => {
                        let changed = member.advance(MemberStatus::Up);
                        if changed {
                            member.up_number = *up_number;
                        }
                        changed
                    }
                    None => false,
                }
            }
            MembershipEvent::NodeLeaving { node } => self.advance(node, MemberStatus::Leaving),
            MembershipEvent::NodeExiting { node } => self.advance(node, MemberStatus::Exiting),
            MembershipEvent::NodeDowned { node } => self.advance(node, MemberStatus::Down),
            MembershipEvent::NodeUnreachable { node } => {
                match self.members.get_mut(node) {
                    Some(member) if !matches!(member.status, MemberStatus::Unreachable | MemberStatus::Down) => {
                        member.reachable_status = Some(member.status);
                        member.status = MemberStatus::Unreachable;
                        true
                    }
                    _ => false,
                }
            }
            MembershipEvent::NodeReachable { node } => {
                match self.members.get_mut(node) {
                    Some(member) if member.status == MemberStatus::Unreachable => {
                        member.status = member.reachable_status.take().unwrap_or(MemberStatus::Joining);
                        true
                    }
                    _ => false,
                }
            }
            MembershipEvent::NodeRemoved { node } => {
                self.ceded.remove(node);
                self.members.remove(node).is_some()
            }
            MembershipEvent::NodeCeded { node } => {
                self.members.contains_key(node) && self.ceded.insert(node.clone())
            }
            MembershipEvent::NodeRestored { node } => self.ceded.remove(node),
        }
    }

    fn advance(&mut self, node: &UniqueAddress, status: MemberStatus) -> bool {
        self.members.get_mut(node).map(|m| m.advance(status)).unwrap_or(false)
    }

    /// Up members that did not cede leadership, oldest first. Members are ranked by
    /// `(up_number, unique_address)`, so the order does not depend on event arrival order.
    pub fn leader_candidate_order(&self) -> Vec<&Member> {
        self.leader_candidate_order_for_role(None)
    }

    pub fn leader_candidate_order_for_role(&self, role: Option<&str>) -> Vec<&Member> {
        self.members
            .values()
            .filter(|m| m.status == MemberStatus::Up)
            .filter(|m| !self.ceded.contains(&m.unique_address))
            .filter(|m| role.map(|r| m.has_role(r)).unwrap_or(true))
            .sorted_by(|a, b| {
                a.up_number.cmp(&b.up_number).then_with(|| a.unique_address.cmp(&b.unique_address))
            })
            .collect()
    }
}
