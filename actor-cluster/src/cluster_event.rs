use std::sync::Arc;

use crate::leader_elector::LeaderHandle;
use crate::membership_event::MembershipEvent;
use crate::membership_view::MembershipView;

#[derive(Debug, Clone)]
pub enum ClusterEvent {
    /// First event every subscriber receives.
    CurrentClusterState(Arc<MembershipView>),
    MembershipChanged {
        event: MembershipEvent,
        view: Arc<MembershipView>,
    },
    /// Role agnostic leader changed. Role restricted subscribers elect from the view themselves.
    LeaderChanged(LeaderHandle),
}

impl ClusterEvent {
    pub fn view(&self) -> Option<&Arc<MembershipView>> {
        match self {
            ClusterEvent::CurrentClusterState(view) => Some(view),
            ClusterEvent::MembershipChanged { view, .. } => Some(view),
            ClusterEvent::LeaderChanged(_) => None,
        }
    }
}
