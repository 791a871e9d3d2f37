use async_trait::async_trait;

use actor_cluster::cluster_event::ClusterEvent;
use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_manager::ClusterSingletonManager;

#[derive(Debug)]
pub(super) struct ClusterEventWrap(pub(super) ClusterEvent);

#[async_trait]
impl Message for ClusterEventWrap {
    type A = ClusterSingletonManager;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        if let Some(view) = self.0.view() {
            actor.on_view_changed(context, view.clone()).await;
        }
        Ok(())
    }
}
