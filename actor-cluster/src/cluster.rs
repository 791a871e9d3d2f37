use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

use ahash::HashSet;
use arc_swap::ArcSwap;

use actor_core::{Actor, Message};
use actor_core::actor::actor_ref::ActorRef;
use actor_core::actor::address::UniqueAddress;
use actor_core::actor::cell::spawn_actor;

use crate::cluster_daemon::apply_membership_event::ApplyMembershipEvent;
use crate::cluster_daemon::ClusterDaemon;
use crate::cluster_daemon::subscribe_cluster_event::SubscribeClusterEvent;
use crate::cluster_event::ClusterEvent;
use crate::leader_elector::{elect_for_role, LeaderHandle};
use crate::member::Member;
use crate::membership_event::MembershipEvent;
use crate::membership_protocol::MembershipProtocol;
use crate::membership_view::MembershipView;

/// Handle to the cluster membership of one node.
#[derive(Clone)]
pub struct Cluster {
    inner: Arc<Inner>,
}

pub struct Inner {
    pub self_unique_address: UniqueAddress,
    pub roles: HashSet<String>,
    daemon: ActorRef<ClusterDaemon>,
    state: Arc<ArcSwap<MembershipView>>,
    protocol: Arc<dyn MembershipProtocol>,
}

impl Deref for Cluster {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Debug for Cluster {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("self_unique_address", &self.self_unique_address)
            .field("roles", &self.roles)
            .field("daemon", &self.daemon)
            .finish_non_exhaustive()
    }
}

impl Cluster {
    /// Spawn the cluster daemon of `self_unique_address`. Must be called inside a tokio runtime.
    pub fn new(self_unique_address: UniqueAddress, roles: HashSet<String>, protocol: Arc<dyn MembershipProtocol>) -> Self {
        let state = Arc::new(ArcSwap::from_pointee(MembershipView::new()));
        let name = format!("cluster_daemon@{}", self_unique_address.socket_addr_with_uid());
        let daemon = spawn_actor(name, ClusterDaemon::new(state.clone()));
        let inner = Inner {
            self_unique_address,
            roles,
            daemon,
            state,
            protocol,
        };
        Self {
            inner: inner.into(),
        }
    }

    /// Feed a membership event from the membership protocol into the local view.
    pub fn apply(&self, event: MembershipEvent) {
        self.daemon.cast(ApplyMembershipEvent(event));
    }

    /// Deliver every cluster event to `subscriber`, starting with the current state. The
    /// subscription ends when the subscriber stops.
    pub fn subscribe<A, M, F>(&self, subscriber: ActorRef<A>, transform: F) -> anyhow::Result<()>
        where
            A: Actor,
            M: Message<A=A>,
            F: Fn(ClusterEvent) -> M + Send + 'static {
        let subscriber = move |event: ClusterEvent| { subscriber.try_cast(transform(event)).is_ok() };
        self.daemon.try_cast(SubscribeClusterEvent(Box::new(subscriber)))?;
        Ok(())
    }

    pub fn state(&self) -> Arc<MembershipView> {
        self.state.load_full()
    }

    pub fn self_member(&self) -> Option<Member> {
        self.state.load().member(&self.self_unique_address).cloned()
    }

    pub fn leader(&self, role: Option<&str>) -> LeaderHandle {
        elect_for_role(&self.state.load(), role)
    }

    pub fn protocol(&self) -> &Arc<dyn MembershipProtocol> {
        &self.protocol
    }

    pub fn leave(&self) {
        self.protocol.leave(&self.self_unique_address);
    }

    pub(crate) fn daemon_ref(&self) -> &ActorRef<ClusterDaemon> {
        &self.daemon
    }

    pub fn is_terminated(&self) -> bool {
        self.daemon.is_terminated()
    }

    pub fn shutdown(&self) {
        self.daemon.stop();
    }
}
