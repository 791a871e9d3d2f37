use async_trait::async_trait;
use tracing::{debug, info, warn};

use actor_core::actor::context::Context;
use actor_core::Message;
use actor_remote::transport::TransportError;

use crate::singleton::cluster_singleton_manager::ClusterSingletonManager;
use crate::singleton::lifecycle::LifecycleState;
use crate::singleton::protocol::{HandoverToken, SingletonReply};

#[derive(Debug)]
pub(super) struct HandOverResponse {
    pub(super) token: HandoverToken,
    pub(super) result: Result<SingletonReply, TransportError>,
}

#[async_trait]
impl Message for HandOverResponse {
    type A = ClusterSingletonManager;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let Self { token, result } = *self;
        let pending = match &actor.handover {
            Some(pending) if pending.token.matches(&token) && actor.state == LifecycleState::Idle => pending,
            _ => {
                debug!("singleton manager {} ignore stale hand over response for {}", actor.settings.singleton_name, token);
                return Ok(());
            }
        };
        match result {
            Ok(SingletonReply::HandOverDone(done)) if pending.token.matches(&done) => {
                info!("singleton manager {} hand over done by {}", actor.settings.singleton_name, done.from);
                actor.start_instance(context).await;
            }
            Ok(SingletonReply::HandOverInProgress(_)) => {
                debug!("singleton manager {} hand over in progress on {}", actor.settings.singleton_name, token.from);
            }
            Ok(reply) => {
                warn!("singleton manager {} unexpected hand over reply {:?}", actor.settings.singleton_name, reply);
            }
            Err(error) => {
                debug!("singleton manager {} hand over request failed: {}", actor.settings.singleton_name, error);
            }
        }
        Ok(())
    }
}
