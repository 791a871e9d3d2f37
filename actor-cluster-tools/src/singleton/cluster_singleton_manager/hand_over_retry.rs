use async_trait::async_trait;
use tracing::{debug, info, warn};

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_manager::ClusterSingletonManager;
use crate::singleton::lifecycle::LifecycleState;

#[derive(Debug)]
pub(super) struct HandOverRetry;

#[async_trait]
impl Message for HandOverRetry {
    type A = ClusterSingletonManager;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        if actor.state != LifecycleState::Idle {
            return Ok(());
        }
        let warn_every = actor.settings.max_hand_over_retries.max(1);
        let Some(pending) = actor.handover.as_mut() else {
            return Ok(());
        };
        if actor.view.is_gone(&pending.token.from) {
            info!("singleton manager {} previous leader {} is gone, take over", actor.settings.singleton_name, pending.token.from);
            actor.start_instance(context).await;
            return Ok(());
        }
        pending.attempts += 1;
        if pending.attempts % warn_every == 0 {
            warn!(
                "singleton manager {} got no hand over answer from {} after {} attempts, wait until it answers or is down",
                actor.settings.singleton_name,
                pending.token.from,
                pending.attempts,
            );
        } else {
            debug!("singleton manager {} retry hand over {}, attempt {}", actor.settings.singleton_name, pending.token, pending.attempts);
        }
        let token = pending.token.clone();
        actor.send_hand_over_to_me(context, token);
        Ok(())
    }
}
