use std::fmt::{Display, Formatter};

use ahash::HashSet;

use actor_core::actor::address::UniqueAddress;

/// Input from the membership protocol. Events are facts about a single node and are
/// applied to the [`MembershipView`](crate::membership_view::MembershipView) in arrival order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MembershipEvent {
    NodeJoined {
        node: UniqueAddress,
        roles: HashSet<String>,
    },
    NodeUp {
        node: UniqueAddress,
        up_number: u64,
    },
    NodeLeaving {
        node: UniqueAddress,
    },
    NodeExiting {
        node: UniqueAddress,
    },
    NodeUnreachable {
        node: UniqueAddress,
    },
    NodeReachable {
        node: UniqueAddress,
    },
    NodeDowned {
        node: UniqueAddress,
    },
    NodeRemoved {
        node: UniqueAddress,
    },
    /// The node gave up leadership for a cooldown, it is skipped by the election.
    NodeCeded {
        node: UniqueAddress,
    },
    NodeRestored {
        node: UniqueAddress,
    },
}

impl MembershipEvent {
    pub fn node(&self) -> &UniqueAddress {
        match self {
            MembershipEvent::NodeJoined { node, .. }
            | MembershipEvent::NodeUp { node, .. }
            | MembershipEvent::NodeLeaving { node }
            | MembershipEvent::NodeExiting { node }
            | MembershipEvent::NodeUnreachable { node }
            | MembershipEvent::NodeReachable { node }
            | MembershipEvent::NodeDowned { node }
            | MembershipEvent::NodeRemoved { node }
            | MembershipEvent::NodeCeded { node }
            | MembershipEvent::NodeRestored { node } => node,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MembershipEvent::NodeJoined { .. } => "NodeJoined",
            MembershipEvent::NodeUp { .. } => "NodeUp",
            MembershipEvent::NodeLeaving { .. } => "NodeLeaving",
            MembershipEvent::NodeExiting { .. } => "NodeExiting",
            MembershipEvent::NodeUnreachable { .. } => "NodeUnreachable",
            MembershipEvent::NodeReachable { .. } => "NodeReachable",
            MembershipEvent::NodeDowned { .. } => "NodeDowned",
            MembershipEvent::NodeRemoved { .. } => "NodeRemoved",
            MembershipEvent::NodeCeded { .. } => "NodeCeded",
            MembershipEvent::NodeRestored { .. } => "NodeRestored",
        }
    }
}

impl Display for MembershipEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.node())
    }
}
