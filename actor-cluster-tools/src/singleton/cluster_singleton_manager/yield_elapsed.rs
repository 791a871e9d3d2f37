use async_trait::async_trait;
use tracing::info;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_manager::ClusterSingletonManager;

/// The claimant never handed back. Ask it for the instance through the regular handover so
/// it is stopped there before this node starts one.
#[derive(Debug)]
pub(super) struct YieldElapsed;

#[async_trait]
impl Message for YieldElapsed {
    type A = ClusterSingletonManager;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        if actor.yield_timer.take().is_none() {
            return Ok(());
        }
        if let Some(claimant) = actor.yield_to.take() {
            info!("singleton manager {} stop yielding to {}, ask it to hand over", actor.singleton_name(), claimant);
            if !actor.view.is_gone(&claimant) {
                actor.previous_leader = Some(claimant);
            }
        }
        actor.reconcile(context).await;
        Ok(())
    }
}
