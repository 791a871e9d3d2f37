use async_trait::async_trait;
use tracing::info;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_manager::ClusterSingletonManager;

#[derive(Debug)]
pub(super) struct CooldownElapsed;

#[async_trait]
impl Message for CooldownElapsed {
    type A = ClusterSingletonManager;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        if actor.cooldown_timer.take().is_some() {
            info!("singleton manager {} cooldown elapsed", actor.singleton_name());
            actor.reconcile(context).await;
        }
        Ok(())
    }
}
