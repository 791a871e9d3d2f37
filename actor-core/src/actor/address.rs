use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct Address {
    pub system: String,
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new(system: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            system: system.into(),
            host: host.into(),
            port,
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tcp://{}@{}:{}", self.system, self.host, self.port)
    }
}

/// An [`Address`] plus the incarnation id of the process bound to it. A restarted
/// node keeps its address but gets a new `uid`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct UniqueAddress {
    pub address: Address,
    pub uid: i64,
}

impl UniqueAddress {
    pub fn new(address: Address, uid: i64) -> Self {
        Self { address, uid }
    }

    pub fn socket_addr_with_uid(&self) -> String {
        format!("{}:{}/{}", self.address.host, self.address.port, self.uid)
    }
}

impl Display for UniqueAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "UniqueAddress({},{})", self.address, self.uid)
    }
}
