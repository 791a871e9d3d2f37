use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::trace;

use actor_core::actor::actor_ref::ActorRef;
use actor_core::actor::address::UniqueAddress;
use actor_core::ext::{decode_bytes, encode_bytes};
use actor_remote::transport::{InboundHandler, Transport, TransportError};

use crate::singleton::cluster_singleton_manager::ClusterSingletonManager;
use crate::singleton::cluster_singleton_manager::inbound_frame::InboundFrame;
use crate::singleton::protocol::{RejectReason, SingletonEnvelope, SingletonFrame, SingletonReply};

/// Inbound side of the singleton protocol on one node. Frames are routed to the local
/// manager of the named singleton; a node without that manager answers as a node that
/// hosts nothing.
#[derive(Clone)]
pub struct SingletonEndpoint {
    address: UniqueAddress,
    managers: Arc<DashMap<String, ActorRef<ClusterSingletonManager>>>,
}

impl Debug for SingletonEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let managers = self.managers.iter().map(|m| m.key().clone()).collect::<Vec<_>>();
        f.debug_struct("SingletonEndpoint")
            .field("address", &self.address)
            .field("managers", &managers)
            .finish()
    }
}

impl SingletonEndpoint {
    pub fn new(address: UniqueAddress) -> Self {
        Self {
            address,
            managers: Arc::new(DashMap::new()),
        }
    }

    pub fn address(&self) -> &UniqueAddress {
        &self.address
    }

    pub(crate) fn is_registered(&self, singleton: &str) -> bool {
        self.managers.get(singleton).map(|m| !m.is_terminated()).unwrap_or(false)
    }

    pub(crate) fn register(&self, singleton: &str, manager: ActorRef<ClusterSingletonManager>) -> anyhow::Result<()> {
        if self.is_registered(singleton) {
            bail!("singleton manager {} already registered on {}", singleton, self.address);
        }
        self.managers.insert(singleton.to_string(), manager);
        Ok(())
    }

    fn unhosted(&self, frame: SingletonFrame) -> SingletonReply {
        match frame {
            SingletonFrame::Request { correlation_id, .. } => {
                SingletonReply::Rejected {
                    correlation_id,
                    reason: RejectReason::NotActive,
                }
            }
            SingletonFrame::Identify => {
                SingletonReply::Identity {
                    node: self.address.clone(),
                    active: false,
                }
            }
            SingletonFrame::HandOverToMe(token) => SingletonReply::HandOverDone(token),
            SingletonFrame::TakeOverFromMe(_) => SingletonReply::Ack,
        }
    }

    async fn dispatch(&self, from: UniqueAddress, envelope: SingletonEnvelope) -> SingletonReply {
        let SingletonEnvelope { singleton, frame } = envelope;
        let manager = self.managers.get(&singleton).map(|m| m.value().clone());
        let Some(manager) = manager else {
            trace!("{} no singleton manager {}, answer {} as unhosted", self.address, singleton, frame.name());
            return self.unhosted(frame);
        };
        let (tx, rx) = oneshot::channel();
        let inbound = InboundFrame {
            from,
            frame: frame.clone(),
            reply: tx,
        };
        if manager.try_cast(inbound).is_err() {
            return self.unhosted(frame);
        }
        match rx.await {
            Ok(reply) => reply,
            Err(_) => self.unhosted(frame),
        }
    }
}

#[async_trait]
impl InboundHandler for SingletonEndpoint {
    async fn on_request(&self, from: UniqueAddress, payload: Vec<u8>) -> anyhow::Result<Vec<u8>> {
        let envelope = decode_bytes::<SingletonEnvelope>(&payload)?;
        let reply = self.dispatch(from, envelope).await;
        encode_bytes(&reply)
    }
}

/// Send one frame and wait for the reply.
pub(crate) async fn request_reply(
    transport: &dyn Transport,
    to: &UniqueAddress,
    envelope: &SingletonEnvelope,
    timeout: Duration,
) -> Result<SingletonReply, TransportError> {
    let payload = encode_bytes(envelope).map_err(|error| TransportError::Codec(format!("{:#}", error)))?;
    let reply = transport.request(to, payload, timeout).await?;
    decode_bytes::<SingletonReply>(&reply).map_err(|error| TransportError::Codec(format!("{:#}", error)))
}
