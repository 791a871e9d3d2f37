use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};

use actor_core::actor::address::UniqueAddress;

/// Identity of one proxied request: the proxy node plus a per proxy sequence.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Encode, Decode)]
pub struct CorrelationId {
    pub origin: UniqueAddress,
    pub sequence: u64,
}

impl Display for CorrelationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.origin.socket_addr_with_uid(), self.sequence)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Encode, Decode)]
pub struct HandoverToken {
    /// View generation in which `to` was elected.
    pub generation: u64,
    pub from: UniqueAddress,
    pub to: UniqueAddress,
}

impl HandoverToken {
    pub fn matches(&self, other: &HandoverToken) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl Display for HandoverToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "HandoverToken({} -> {}, generation {})", self.from, self.to, self.generation)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Encode, Decode)]
pub struct SingletonEnvelope {
    pub singleton: String,
    pub frame: SingletonFrame,
}

#[derive(Debug, Clone, Eq, PartialEq, Encode, Decode)]
pub enum SingletonFrame {
    Request {
        correlation_id: CorrelationId,
        idempotency_key: Option<String>,
        payload: Vec<u8>,
    },
    Identify,
    HandOverToMe(HandoverToken),
    TakeOverFromMe(HandoverToken),
}

impl SingletonFrame {
    pub fn name(&self) -> &'static str {
        match self {
            SingletonFrame::Request { .. } => "Request",
            SingletonFrame::Identify => "Identify",
            SingletonFrame::HandOverToMe(_) => "HandOverToMe",
            SingletonFrame::TakeOverFromMe(_) => "TakeOverFromMe",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Encode, Decode)]
pub enum SingletonReply {
    Response {
        correlation_id: CorrelationId,
        payload: Vec<u8>,
    },
    Rejected {
        correlation_id: CorrelationId,
        reason: RejectReason,
    },
    Identity {
        node: UniqueAddress,
        active: bool,
    },
    HandOverInProgress(HandoverToken),
    HandOverDone(HandoverToken),
    Ack,
}

#[derive(Debug, Clone, Eq, PartialEq, Encode, Decode)]
pub enum RejectReason {
    /// The node does not host an active instance, the request was not handled.
    NotActive,
    /// The instance handled the request and failed.
    Failed(String),
}
