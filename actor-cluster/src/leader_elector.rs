use crate::member::Member;
use crate::membership_view::MembershipView;

/// The leader elected for one view generation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LeaderHandle {
    pub generation: u64,
    pub leader: Option<Member>,
}

/// Oldest Up member that did not cede leadership. Every node holding an equal view elects
/// the same member.
pub fn elect(view: &MembershipView) -> LeaderHandle {
    elect_for_role(view, None)
}

pub fn elect_for_role(view: &MembershipView, role: Option<&str>) -> LeaderHandle {
    LeaderHandle {
        generation: view.generation(),
        leader: view.leader_candidate_order_for_role(role).into_iter().next().cloned(),
    }
}
