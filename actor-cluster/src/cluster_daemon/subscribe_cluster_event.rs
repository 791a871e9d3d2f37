use std::sync::Arc;

use async_trait::async_trait;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::cluster_daemon::{ClusterDaemon, Subscriber};
use crate::cluster_event::ClusterEvent;

pub(crate) struct SubscribeClusterEvent(pub(crate) Subscriber);

#[async_trait]
impl Message for SubscribeClusterEvent {
    type A = ClusterDaemon;

    async fn handle(self: Box<Self>, _context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let subscriber = self.0;
        let current = ClusterEvent::CurrentClusterState(Arc::new(actor.view.clone()));
        if subscriber(current) {
            actor.subscribers.push(subscriber);
        }
        Ok(())
    }
}
