use async_trait::async_trait;
use tracing::{debug, warn};

use actor_cluster_tools::singleton::error::SingletonError;
use actor_core::actor::context::Context;
use actor_core::Message;

use crate::ping_pong::{Ping, Pong};
use crate::singleton_aware::SingletonAware;

#[derive(Debug)]
pub(super) struct PongReceived {
    pub(super) ping: Ping,
    pub(super) result: Result<Pong, SingletonError>,
}

#[async_trait]
impl Message for PongReceived {
    type A = SingletonAware;

    async fn handle(self: Box<Self>, _context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let Self { ping, result } = *self;
        match result {
            Ok(pong) => {
                debug!("{:?} <- singleton", pong);
                if actor.last_ping != Some(pong.id) {
                    warn!("pong id invalid, expected {:?}, actual {}", actor.last_ping, pong.id);
                }
                if let Some(listener) = &actor.listener {
                    let _ = listener.send(pong);
                }
            }
            Err(error) => {
                warn!("{:?} not answered: {}", ping, error);
            }
        }
        Ok(())
    }
}
