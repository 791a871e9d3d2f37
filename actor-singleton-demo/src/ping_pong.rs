use async_trait::async_trait;
use bincode::{Decode, Encode};
use tracing::debug;

use actor_cluster_tools::singleton::{Singleton, SingletonProps, SingletonRequest};
use actor_core::ext::{decode_bytes, encode_bytes};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Encode, Decode)]
pub struct Ping {
    pub id: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Encode, Decode)]
pub struct Pong {
    pub id: u64,
    /// Pings answered by the current instance, restarts from one after a failover.
    pub count: u64,
}

#[derive(Debug, Default)]
pub struct PingPongSingleton {
    count: u64,
}

impl PingPongSingleton {
    pub fn props() -> SingletonProps {
        SingletonProps::new(|| Ok(PingPongSingleton::default()))
    }
}

#[async_trait]
impl Singleton for PingPongSingleton {
    async fn started(&mut self) -> anyhow::Result<()> {
        debug!("ping pong singleton started");
        Ok(())
    }

    async fn handle(&mut self, request: SingletonRequest) -> anyhow::Result<Vec<u8>> {
        let ping = decode_bytes::<Ping>(&request.payload)?;
        self.count += 1;
        debug!("{:?} <- {}", ping, request.correlation_id.origin);
        encode_bytes(&Pong { id: ping.id, count: self.count })
    }

    async fn stopped(&mut self) -> anyhow::Result<()> {
        debug!("ping pong singleton stopped after {} pings", self.count);
        Ok(())
    }
}
