use async_trait::async_trait;
use tracing::trace;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_proxy::{ClusterSingletonProxy, DeliveryFailure};

/// The pipeline of route `route_id` stopped after failing to deliver `sequence`.
#[derive(Debug)]
pub(super) struct RouteFailed {
    pub(super) route_id: u64,
    pub(super) sequence: u64,
    pub(super) failure: DeliveryFailure,
}

#[async_trait]
impl Message for RouteFailed {
    type A = ClusterSingletonProxy;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let Self { route_id, sequence, failure } = *self;
        if actor.route.as_ref().map(|route| route.id) != Some(route_id) {
            trace!("singleton proxy {} ignore failure of stale route {}", actor.singleton_name(), route_id);
            return Ok(());
        }
        actor.on_delivery_failed(sequence, failure);
        actor.drop_route();
        actor.identify_singleton(context);
        Ok(())
    }
}
