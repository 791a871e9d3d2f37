use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use actor_core::actor::address::UniqueAddress;
use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_manager::ClusterSingletonManager;
use crate::singleton::error::SingletonError;
use crate::singleton::lifecycle::LifecycleState;
use crate::singleton::protocol::{SingletonFrame, SingletonReply};

/// A frame received from another node. The reply goes back on the same request.
#[derive(Debug)]
pub(crate) struct InboundFrame {
    pub(crate) from: UniqueAddress,
    pub(crate) frame: SingletonFrame,
    pub(crate) reply: oneshot::Sender<SingletonReply>,
}

#[async_trait]
impl Message for InboundFrame {
    type A = ClusterSingletonManager;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let Self { from, frame, reply } = *self;
        match frame {
            SingletonFrame::Request { correlation_id, idempotency_key, payload } => {
                let response = actor.handle_request(correlation_id, idempotency_key, payload).await;
                let _ = reply.send(response);
            }
            SingletonFrame::Identify => {
                let identity = SingletonReply::Identity {
                    node: actor.self_address().clone(),
                    active: actor.state == LifecycleState::Active,
                };
                let _ = reply.send(identity);
            }
            SingletonFrame::HandOverToMe(token) => {
                if actor.state != LifecycleState::Active {
                    debug!("singleton manager {} not active, hand over done to {}", actor.singleton_name(), from);
                    let _ = reply.send(SingletonReply::HandOverDone(token));
                    return Ok(());
                }
                if actor.elected_leader().as_ref() == Some(actor.self_address()) {
                    let ambiguous = SingletonError::ElectionAmbiguous {
                        singleton: actor.singleton_name().to_string(),
                        elected: actor.self_address().clone(),
                        claimant: token.to.clone(),
                    };
                    error!("{}", ambiguous);
                    actor.begin_yield(context, token.to.clone());
                }
                info!("singleton manager {} hand over to {}", actor.singleton_name(), token.to);
                let _ = reply.send(SingletonReply::HandOverInProgress(token));
                let lead = actor.should_lead();
                actor.track_leadership(lead);
                actor.stop_instance(context).await;
            }
            SingletonFrame::TakeOverFromMe(token) => {
                let _ = reply.send(SingletonReply::Ack);
                if actor.yield_to.as_ref() == Some(&token.from) {
                    info!("singleton manager {} {} handed back, stop yielding", actor.singleton_name(), token.from);
                    actor.end_yield();
                    actor.previous_leader = None;
                    actor.reconcile(context).await;
                    return Ok(());
                }
                let expected = actor.handover
                    .as_ref()
                    .map(|pending| pending.token.from == token.from)
                    .unwrap_or(false);
                if expected && actor.state == LifecycleState::Idle {
                    info!("singleton manager {} take over from {}", actor.singleton_name(), token.from);
                    actor.start_instance(context).await;
                } else {
                    debug!("singleton manager {} ignore take over from {}", actor.singleton_name(), token.from);
                }
            }
        }
        Ok(())
    }
}
