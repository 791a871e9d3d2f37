use bincode::{Decode, Encode};

use actor_core::actor::address::UniqueAddress;

/// Unit of the wire protocol between two nodes. The payload is opaque to the
/// transport, the receiving [`crate::transport::InboundHandler`] decodes it.
#[derive(Debug, Clone, Eq, PartialEq, Encode, Decode)]
pub struct RemoteEnvelope {
    pub from: UniqueAddress,
    pub to: UniqueAddress,
    pub payload: Vec<u8>,
}
