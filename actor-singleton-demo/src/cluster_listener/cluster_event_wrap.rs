use async_trait::async_trait;
use tracing::info;

use actor_cluster::cluster_event::ClusterEvent;
use actor_core::actor::context::Context;
use actor_core::Message;

use crate::cluster_listener::ClusterListener;

#[derive(Debug)]
pub(super) struct ClusterEventWrap(pub(super) ClusterEvent);

#[async_trait]
impl Message for ClusterEventWrap {
    type A = ClusterListener;

    async fn handle(self: Box<Self>, _context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let node = &actor.cluster.self_unique_address;
        match self.0 {
            ClusterEvent::CurrentClusterState(view) => {
                let members = view.members().map(|m| m.to_string()).collect::<Vec<_>>();
                info!("{} current cluster members {:?}", node, members);
            }
            ClusterEvent::MembershipChanged { event, view } => {
                info!("{} membership changed {}, generation {}", node, event, view.generation());
                if let Some(forward) = &actor.forward {
                    let _ = forward.send(event);
                }
            }
            ClusterEvent::LeaderChanged(handle) => {
                match handle.leader {
                    Some(leader) => info!("{} cluster leader is {}", node, leader),
                    None => info!("{} cluster has no leader", node),
                }
            }
        }
        Ok(())
    }
}
