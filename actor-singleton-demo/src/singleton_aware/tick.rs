use async_trait::async_trait;
use tracing::debug;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::ping_pong::{Ping, Pong};
use crate::singleton_aware::pong_received::PongReceived;
use crate::singleton_aware::SingletonAware;

#[derive(Debug)]
pub(super) struct Tick;

#[async_trait]
impl Message for Tick {
    type A = SingletonAware;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        let ping = Ping { id: actor.next_id };
        actor.next_id += 1;
        actor.last_ping = Some(ping.id);
        debug!("{:?} -> singleton", ping);
        let proxy = actor.proxy.clone();
        let myself = context.myself().clone();
        context.spawn_fut(async move {
            let result = proxy.ask::<Ping, Pong>(&ping).await;
            myself.cast(PongReceived { ping, result });
        });
        Ok(())
    }
}
