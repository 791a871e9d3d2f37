use async_trait::async_trait;
use tracing::{debug, error, trace, warn};

use actor_core::actor::address::UniqueAddress;
use actor_core::actor::context::Context;
use actor_core::Message;
use actor_remote::transport::TransportError;

use crate::singleton::cluster_singleton_proxy::ClusterSingletonProxy;
use crate::singleton::error::SingletonError;
use crate::singleton::protocol::SingletonReply;

#[derive(Debug)]
pub(super) struct IdentifyResult {
    pub(super) target: UniqueAddress,
    pub(super) result: Result<SingletonReply, TransportError>,
}

#[async_trait]
impl Message for IdentifyResult {
    type A = ClusterSingletonProxy;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let Self { target, result } = *self;
        if actor.route.is_some() {
            return Ok(());
        }
        match result {
            Ok(SingletonReply::Identity { node, active: true }) => {
                if actor.target.as_ref() == Some(&node) {
                    actor.establish_route(context, node);
                } else if let Some(elected) = actor.target.clone() {
                    let ambiguous = SingletonError::ElectionAmbiguous {
                        singleton: actor.singleton_name().to_string(),
                        elected,
                        claimant: node,
                    };
                    error!("{}", ambiguous);
                }
            }
            Ok(SingletonReply::Identity { node, active: false }) => {
                trace!("singleton proxy {} singleton on {} not active yet", actor.singleton_name(), node);
            }
            Ok(reply) => {
                warn!("singleton proxy {} unexpected identify reply {:?} from {}", actor.singleton_name(), reply, target);
            }
            Err(error) => {
                debug!("singleton proxy {} identify singleton at {} failed: {}", actor.singleton_name(), target, error);
            }
        }
        Ok(())
    }
}
