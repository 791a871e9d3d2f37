use async_trait::async_trait;
use tracing::{error, trace};

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_proxy::ClusterSingletonProxy;
use crate::singleton::error::SingletonError;
use crate::singleton::protocol::{RejectReason, SingletonReply};

#[derive(Debug)]
pub(super) struct DeliveryResult {
    pub(super) sequence: u64,
    pub(super) reply: SingletonReply,
}

#[async_trait]
impl Message for DeliveryResult {
    type A = ClusterSingletonProxy;

    async fn handle(self: Box<Self>, _context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let Self { sequence, reply } = *self;
        let (correlation_id, result) = match reply {
            SingletonReply::Response { correlation_id, payload } => (correlation_id, Ok(payload)),
            SingletonReply::Rejected { correlation_id, reason: RejectReason::Failed(error) } => {
                (correlation_id, Err(SingletonError::Remote(error)))
            }
            other => {
                error!("singleton proxy {} unexpected reply {:?} for request {}", actor.singleton_name(), other, sequence);
                return Ok(());
            }
        };
        if correlation_id.sequence != sequence || correlation_id.origin != actor.cluster.self_unique_address {
            error!("singleton proxy {} reply {} does not match request {}, drop it", actor.singleton_name(), correlation_id, sequence);
            return Ok(());
        }
        if !actor.complete(sequence, result) {
            trace!("singleton proxy {} request {} already answered", actor.singleton_name(), sequence);
        }
        Ok(())
    }
}
