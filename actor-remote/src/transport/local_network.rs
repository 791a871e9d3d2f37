use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use ahash::HashSet;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use actor_core::actor::address::{Address, UniqueAddress};
use actor_core::ext::{decode_bytes, encode_bytes};

use crate::remote_envelope::RemoteEnvelope;
use crate::transport::{InboundHandler, Transport, TransportError};

/// In-process network shared by every node of a simulated cluster. Messages still
/// cross it as encoded [`RemoteEnvelope`] bytes, and nodes can be crashed or
/// partitioned from each other.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    endpoints: DashMap<Address, Endpoint>,
    partitions: RwLock<HashSet<(Address, Address)>>,
}

#[derive(Clone)]
struct Endpoint {
    uid: i64,
    handler: Arc<dyn InboundHandler>,
}

impl Debug for LocalNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let endpoints = self.inner.endpoints.iter().map(|e| e.key().to_string()).collect::<Vec<_>>();
        f.debug_struct("LocalNetwork")
            .field("endpoints", &endpoints)
            .finish_non_exhaustive()
    }
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `address`, replacing any previous incarnation bound to the same
    /// host and port.
    pub fn bind(&self, address: UniqueAddress, handler: Arc<dyn InboundHandler>) -> LocalTransport {
        let endpoint = Endpoint {
            uid: address.uid,
            handler,
        };
        if let Some(previous) = self.inner.endpoints.insert(address.address.clone(), endpoint) {
            debug!("{} rebind, previous incarnation {} replaced", address, previous.uid);
        }
        LocalTransport {
            network: self.clone(),
            address,
        }
    }

    /// Whether some incarnation is bound to the host and port of `address`.
    pub fn is_bound(&self, address: &Address) -> bool {
        self.inner.endpoints.contains_key(address)
    }

    /// Simulate a crash: requests to `address` fail as unreachable from now on.
    pub fn unbind(&self, address: &UniqueAddress) {
        self.inner.endpoints.remove_if(&address.address, |_, endpoint| endpoint.uid == address.uid);
    }

    pub fn partition(&self, a: &Address, b: &Address) {
        let mut partitions = self.inner.partitions.write();
        partitions.insert((a.clone(), b.clone()));
        partitions.insert((b.clone(), a.clone()));
    }

    pub fn heal(&self, a: &Address, b: &Address) {
        let mut partitions = self.inner.partitions.write();
        partitions.remove(&(a.clone(), b.clone()));
        partitions.remove(&(b.clone(), a.clone()));
    }

    pub fn heal_all(&self) {
        self.inner.partitions.write().clear();
    }

    fn resolve(&self, from: &UniqueAddress, to: &UniqueAddress) -> Result<Arc<dyn InboundHandler>, TransportError> {
        if self.inner.partitions.read().contains(&(from.address.clone(), to.address.clone())) {
            trace!("{} partitioned from {}", from, to);
            return Err(TransportError::Unreachable(to.clone()));
        }
        match self.inner.endpoints.get(&to.address) {
            Some(endpoint) if endpoint.uid == to.uid => Ok(endpoint.handler.clone()),
            _ => Err(TransportError::Unreachable(to.clone())),
        }
    }
}

#[derive(Clone)]
pub struct LocalTransport {
    network: LocalNetwork,
    address: UniqueAddress,
}

impl Debug for LocalTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalTransport {
    pub fn network(&self) -> &LocalNetwork {
        &self.network
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn local_address(&self) -> &UniqueAddress {
        &self.address
    }

    async fn request(&self, to: &UniqueAddress, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let envelope = RemoteEnvelope {
            from: self.address.clone(),
            to: to.clone(),
            payload,
        };
        let bytes = encode_bytes(&envelope).map_err(|error| TransportError::Codec(format!("{:#}", error)))?;
        let handler = self.network.resolve(&self.address, to)?;
        let remote = to.clone();
        let inbound = tokio::spawn(async move {
            let envelope = decode_bytes::<RemoteEnvelope>(&bytes)
                .map_err(|error| TransportError::Codec(format!("{:#}", error)))?;
            let RemoteEnvelope { from, payload, .. } = envelope;
            handler.on_request(from, payload).await.map_err(|error| TransportError::Remote {
                from: remote,
                error: format!("{:#}", error),
            })
        });
        match tokio::time::timeout(timeout, inbound).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(join_error)) => {
                Err(TransportError::Remote {
                    from: to.clone(),
                    error: join_error.to_string(),
                })
            }
            Err(_) => {
                Err(TransportError::Timeout {
                    to: to.clone(),
                    timeout,
                })
            }
        }
    }
}
