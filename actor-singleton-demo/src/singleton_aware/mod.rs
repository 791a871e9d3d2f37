use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use actor_cluster_tools::singleton::cluster_singleton_proxy::ClusterSingletonProxyRef;
use actor_core::Actor;
use actor_core::actor::context::Context;
use actor_core::actor::scheduler::ScheduleKey;

use crate::ping_pong::Pong;
use crate::singleton_aware::tick::Tick;

mod pong_received;
mod tick;

/// Pings the singleton through the local proxy on every tick and checks that the pong
/// answers the latest ping.
#[derive(Debug)]
pub struct SingletonAware {
    proxy: ClusterSingletonProxyRef,
    tick_interval: Duration,
    next_id: u64,
    last_ping: Option<u64>,
    ticker: Option<ScheduleKey>,
    listener: Option<UnboundedSender<Pong>>,
}

impl SingletonAware {
    pub fn new(proxy: ClusterSingletonProxyRef, tick_interval: Duration) -> Self {
        Self {
            proxy,
            tick_interval,
            next_id: 0,
            last_ping: None,
            ticker: None,
            listener: None,
        }
    }

    /// Every pong received is also sent to `listener`.
    pub fn with_listener(mut self, listener: UnboundedSender<Pong>) -> Self {
        self.listener = Some(listener);
        self
    }
}

#[async_trait]
impl Actor for SingletonAware {
    async fn started(&mut self, context: &mut Context<Self>) -> anyhow::Result<()> {
        debug!("{} start", context.myself());
        let myself = context.myself().clone();
        let ticker = context.scheduler().schedule_with_fixed_delay(
            Some(Duration::ZERO),
            self.tick_interval,
            move || { myself.cast(Tick); },
        );
        self.ticker = Some(ticker);
        Ok(())
    }

    async fn stopped(&mut self, context: &mut Context<Self>) -> anyhow::Result<()> {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        debug!("{} stop", context.myself());
        Ok(())
    }
}
