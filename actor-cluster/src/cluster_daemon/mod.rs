use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tracing::debug;

use actor_core::Actor;
use actor_core::actor::context::Context;

use crate::cluster_event::ClusterEvent;
use crate::leader_elector::{elect, LeaderHandle};
use crate::membership_view::MembershipView;

pub(crate) mod apply_membership_event;
pub(crate) mod subscribe_cluster_event;

pub(crate) type Subscriber = Box<dyn Fn(ClusterEvent) -> bool + Send>;

/// Owns the local [`MembershipView`]. The view is only mutated by this actor, readers
/// get the immutable snapshot published through `state`.
pub struct ClusterDaemon {
    view: MembershipView,
    state: Arc<ArcSwap<MembershipView>>,
    leader: LeaderHandle,
    subscribers: Vec<Subscriber>,
}

impl Debug for ClusterDaemon {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterDaemon")
            .field("view", &self.view)
            .field("leader", &self.leader)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl ClusterDaemon {
    pub(crate) fn new(state: Arc<ArcSwap<MembershipView>>) -> Self {
        let view = MembershipView::new();
        let leader = elect(&view);
        Self {
            view,
            state,
            leader,
            subscribers: vec![],
        }
    }

    fn publish(&mut self, event: ClusterEvent) {
        let before = self.subscribers.len();
        self.subscribers.retain(|subscriber| subscriber(event.clone()));
        let closed = before - self.subscribers.len();
        if closed > 0 {
            debug!("remove {} closed cluster event subscribers", closed);
        }
    }
}

#[async_trait]
impl Actor for ClusterDaemon {
    async fn stopped(&mut self, _context: &mut Context<Self>) -> anyhow::Result<()> {
        self.subscribers.clear();
        Ok(())
    }
}
