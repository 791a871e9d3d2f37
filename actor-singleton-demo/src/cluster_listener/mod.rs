use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use actor_cluster::cluster::Cluster;
use actor_cluster::membership_event::MembershipEvent;
use actor_core::Actor;
use actor_core::actor::context::Context;

use crate::cluster_listener::cluster_event_wrap::ClusterEventWrap;

mod cluster_event_wrap;

/// Logs every membership change seen by the local node.
#[derive(Debug)]
pub struct ClusterListener {
    cluster: Cluster,
    forward: Option<UnboundedSender<MembershipEvent>>,
}

impl ClusterListener {
    pub fn new(cluster: Cluster) -> Self {
        Self {
            cluster,
            forward: None,
        }
    }

    /// Every membership event is also sent to `forward`.
    pub fn with_forward(mut self, forward: UnboundedSender<MembershipEvent>) -> Self {
        self.forward = Some(forward);
        self
    }
}

#[async_trait]
impl Actor for ClusterListener {
    async fn started(&mut self, context: &mut Context<Self>) -> anyhow::Result<()> {
        debug!("{} start", context.myself());
        self.cluster.subscribe(context.myself().clone(), ClusterEventWrap)?;
        Ok(())
    }
}
