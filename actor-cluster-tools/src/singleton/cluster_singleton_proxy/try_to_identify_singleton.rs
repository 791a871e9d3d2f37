use async_trait::async_trait;
use tracing::trace;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_proxy::ClusterSingletonProxy;
use crate::singleton::cluster_singleton_proxy::identify_result::IdentifyResult;
use crate::singleton::protocol::{SingletonEnvelope, SingletonFrame};
use crate::singleton::singleton_endpoint::request_reply;

#[derive(Debug)]
pub(super) struct TryToIdentifySingleton;

#[async_trait]
impl Message for TryToIdentifySingleton {
    type A = ClusterSingletonProxy;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        if actor.identify_timer.is_none() || actor.route.is_some() {
            return Ok(());
        }
        if let Some(target) = actor.target.clone() {
            trace!("singleton proxy {} try to identify singleton at {}", actor.singleton_name(), target);
            let envelope = SingletonEnvelope {
                singleton: actor.singleton_name().to_string(),
                frame: SingletonFrame::Identify,
            };
            let transport = actor.transport.clone();
            let timeout = actor.settings.delivery_timeout;
            let myself = context.myself().clone();
            context.spawn_fut(async move {
                let result = request_reply(&*transport, &target, &envelope, timeout).await;
                myself.cast(IdentifyResult { target, result });
            });
        }
        Ok(())
    }
}
