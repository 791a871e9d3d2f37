use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::cluster_daemon::ClusterDaemon;
use crate::cluster_event::ClusterEvent;
use crate::leader_elector::elect;
use crate::membership_event::MembershipEvent;

#[derive(Debug)]
pub(crate) struct ApplyMembershipEvent(pub(crate) MembershipEvent);

#[async_trait]
impl Message for ApplyMembershipEvent {
    type A = ClusterDaemon;

    async fn handle(self: Box<Self>, _context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let event = self.0;
        let generation = actor.view.generation();
        if actor.view.apply(&event) == generation {
            return Ok(());
        }
        let view = Arc::new(actor.view.clone());
        actor.state.store(view.clone());
        actor.publish(ClusterEvent::MembershipChanged { event, view });
        let leader = elect(&actor.view);
        if leader.leader != actor.leader.leader {
            match &leader.leader {
                None => info!("cluster leader lost at generation {}", leader.generation),
                Some(member) => info!("cluster leader changed to {} at generation {}", member, leader.generation),
            }
            actor.leader = leader.clone();
            actor.publish(ClusterEvent::LeaderChanged(leader));
        }
        Ok(())
    }
}
