use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use actor_core::actor::address::UniqueAddress;

pub mod local_network;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum TransportError {
    #[error("node {0} is unreachable")]
    Unreachable(UniqueAddress),
    #[error("request to {to} timeout after {timeout:?}")]
    Timeout {
        to: UniqueAddress,
        timeout: Duration,
    },
    #[error("codec error: {0}")]
    Codec(String),
    #[error("node {from} failed to handle request: {error}")]
    Remote {
        from: UniqueAddress,
        error: String,
    },
}

/// Outbound side of the network boundary. Every call is a request with an explicit
/// timeout; the reply travels back on the same call.
#[async_trait]
pub trait Transport: Debug + Send + Sync + 'static {
    fn local_address(&self) -> &UniqueAddress;

    async fn request(&self, to: &UniqueAddress, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

/// Inbound side of the network boundary, one per bound node.
#[async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    async fn on_request(&self, from: UniqueAddress, payload: Vec<u8>) -> anyhow::Result<Vec<u8>>;
}
