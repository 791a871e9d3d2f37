use std::time::Duration;

use actor_core::actor::address::UniqueAddress;

/// Control requests a node can make to the membership protocol. Results come back as
/// [`MembershipEvent`](crate::membership_event::MembershipEvent)s.
pub trait MembershipProtocol: Send + Sync + 'static {
    /// Exclude `node` from leader election for `cooldown`.
    fn cede_leadership(&self, node: &UniqueAddress, cooldown: Duration);

    /// Gracefully remove `node` from the cluster.
    fn leave(&self, node: &UniqueAddress);
}
