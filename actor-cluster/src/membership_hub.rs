use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use ahash::HashSet;
use parking_lot::Mutex;
use tracing::{debug, info};

use actor_core::actor::actor_ref::ActorRef;
use actor_core::actor::address::UniqueAddress;

use crate::cluster::Cluster;
use crate::cluster_daemon::apply_membership_event::ApplyMembershipEvent;
use crate::cluster_daemon::ClusterDaemon;
use crate::membership_event::MembershipEvent;
use crate::membership_protocol::MembershipProtocol;

/// In-process stand-in for the membership protocol. Every published event reaches every
/// registered node in the same order, so all local views converge. A node joining late
/// receives the event history first.
#[derive(Clone, Default)]
pub struct MembershipHub {
    inner: Arc<Mutex<HubState>>,
}

#[derive(Default)]
struct HubState {
    daemons: BTreeMap<UniqueAddress, ActorRef<ClusterDaemon>>,
    history: Vec<MembershipEvent>,
    up_number: u64,
}

impl Debug for MembershipHub {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("MembershipHub")
            .field("nodes", &state.daemons.keys().collect::<Vec<_>>())
            .field("history", &state.history.len())
            .finish()
    }
}

impl MembershipHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the [`Cluster`] of `node` and move it to Up.
    pub fn join(&self, node: UniqueAddress, roles: HashSet<String>) -> Cluster {
        let cluster = Cluster::new(node.clone(), roles.clone(), Arc::new(self.clone()));
        let mut state = self.inner.lock();
        for event in &state.history {
            cluster.apply(event.clone());
        }
        state.daemons.insert(node.clone(), cluster.daemon_ref().clone());
        state.up_number += 1;
        let up_number = state.up_number;
        info!("{} join cluster with up number {}", node, up_number);
        Self::publish_locked(&mut state, MembershipEvent::NodeJoined { node: node.clone(), roles });
        Self::publish_locked(&mut state, MembershipEvent::NodeUp { node, up_number });
        cluster
    }

    pub fn publish(&self, event: MembershipEvent) {
        let mut state = self.inner.lock();
        Self::publish_locked(&mut state, event);
    }

    fn publish_locked(state: &mut HubState, event: MembershipEvent) {
        debug!("membership hub publish {}", event);
        state.daemons.retain(|_, daemon| !daemon.is_terminated());
        for daemon in state.daemons.values() {
            daemon.cast(ApplyMembershipEvent(event.clone()));
        }
        state.history.push(event);
    }

    /// Graceful exit: Leaving, Exiting, then Removed.
    pub fn leave(&self, node: &UniqueAddress) {
        let mut state = self.inner.lock();
        for event in [
            MembershipEvent::NodeLeaving { node: node.clone() },
            MembershipEvent::NodeExiting { node: node.clone() },
            MembershipEvent::NodeRemoved { node: node.clone() },
        ] {
            Self::publish_locked(&mut state, event);
        }
        state.daemons.remove(node);
    }

    /// Down decision followed by removal.
    pub fn down(&self, node: &UniqueAddress) {
        let mut state = self.inner.lock();
        Self::publish_locked(&mut state, MembershipEvent::NodeDowned { node: node.clone() });
        Self::publish_locked(&mut state, MembershipEvent::NodeRemoved { node: node.clone() });
        state.daemons.remove(node);
    }

    pub fn unreachable(&self, node: &UniqueAddress) {
        self.publish(MembershipEvent::NodeUnreachable { node: node.clone() });
    }

    pub fn reachable(&self, node: &UniqueAddress) {
        self.publish(MembershipEvent::NodeReachable { node: node.clone() });
    }

    pub fn nodes(&self) -> Vec<UniqueAddress> {
        self.inner.lock().daemons.keys().cloned().collect()
    }
}

impl MembershipProtocol for MembershipHub {
    fn cede_leadership(&self, node: &UniqueAddress, cooldown: Duration) {
        info!("{} cede leadership for {:?}", node, cooldown);
        self.publish(MembershipEvent::NodeCeded { node: node.clone() });
        let hub = self.clone();
        let node = node.clone();
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            debug!("{} leadership cooldown elapsed", node);
            hub.publish(MembershipEvent::NodeRestored { node });
        });
    }

    fn leave(&self, node: &UniqueAddress) {
        MembershipHub::leave(self, node);
    }
}
