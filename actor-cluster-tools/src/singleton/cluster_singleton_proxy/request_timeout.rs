use async_trait::async_trait;
use tracing::debug;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_proxy::ClusterSingletonProxy;
use crate::singleton::error::SingletonError;

#[derive(Debug)]
pub(super) struct RequestTimeout(pub(super) u64);

#[async_trait]
impl Message for RequestTimeout {
    type A = ClusterSingletonProxy;

    async fn handle(self: Box<Self>, _context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let sequence = self.0;
        let timeout = actor.settings.request_timeout;
        if actor.complete(sequence, Err(SingletonError::RoutingTimeout(timeout))) {
            debug!("singleton proxy {} request {} timeout after {:?}", actor.singleton_name(), sequence, timeout);
        }
        Ok(())
    }
}
