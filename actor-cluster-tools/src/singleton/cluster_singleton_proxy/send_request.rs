use async_trait::async_trait;
use tracing::debug;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_proxy::{ClusterSingletonProxy, DeliveryStatus, PendingRequest, ReplySender};
use crate::singleton::cluster_singleton_proxy::request_timeout::RequestTimeout;

#[derive(Debug)]
pub(super) struct SendRequest {
    pub(super) payload: Vec<u8>,
    pub(super) idempotency_key: Option<String>,
    pub(super) reply: ReplySender,
}

#[async_trait]
impl Message for SendRequest {
    type A = ClusterSingletonProxy;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let Self { payload, idempotency_key, reply } = *self;
        let sequence = actor.next_sequence;
        actor.next_sequence += 1;
        let myself = context.myself().clone();
        let timeout = context.scheduler().schedule_once(actor.settings.request_timeout, move || {
            myself.cast(RequestTimeout(sequence));
        });
        let request = PendingRequest {
            idempotency_key,
            payload,
            reply,
            status: DeliveryStatus::Buffered,
            attempts: 0,
            timeout,
        };
        actor.pending.insert(sequence, request);
        match &actor.route {
            None => debug!("singleton proxy {} buffer request {}", actor.singleton_name(), sequence),
            Some(route) => debug!("singleton proxy {} forward request {} to {}", actor.singleton_name(), sequence, route.host),
        }
        actor.flush();
        actor.enforce_buffer_size();
        Ok(())
    }
}
