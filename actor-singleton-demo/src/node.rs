use std::sync::Arc;
use std::time::Duration;

use ahash::HashSet;
use anyhow::bail;
use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use actor_cluster::cluster::Cluster;
use actor_cluster::membership_hub::MembershipHub;
use actor_cluster_tools::config::ClusterToolsConfig;
use actor_cluster_tools::singleton::cluster_singleton::ClusterSingleton;
use actor_cluster_tools::singleton::cluster_singleton_manager::ClusterSingletonManagerRef;
use actor_cluster_tools::singleton::cluster_singleton_proxy::ClusterSingletonProxyRef;
use actor_cluster_tools::singleton::singleton_endpoint::SingletonEndpoint;
use actor_core::actor::actor_ref::ActorRef;
use actor_core::actor::address::{Address, UniqueAddress};
use actor_core::actor::cell::spawn_actor;
use actor_core::ext::random_uid;
use actor_remote::transport::local_network::LocalNetwork;

use crate::cluster_listener::ClusterListener;
use crate::ping_pong::{PingPongSingleton, Pong};
use crate::singleton_aware::SingletonAware;

pub const SYSTEM_NAME: &str = "singleton";

const RANDOM_PORT_ATTEMPTS: usize = 100;

/// One in-process cluster node running the ping/pong manager, a proxy and the ticker.
#[derive(Debug)]
pub struct DemoNode {
    pub address: UniqueAddress,
    pub cluster: Cluster,
    pub manager: ClusterSingletonManagerRef,
    pub proxy: ClusterSingletonProxyRef,
    pub aware: ActorRef<SingletonAware>,
    pub listener: ActorRef<ClusterListener>,
}

impl DemoNode {
    /// Port 0 picks a random port.
    pub fn start(
        hub: &MembershipHub,
        network: &LocalNetwork,
        port: u16,
        config: &ClusterToolsConfig,
        tick_interval: Duration,
        listener: Option<UnboundedSender<Pong>>,
    ) -> anyhow::Result<Self> {
        let address = UniqueAddress::new(free_address(network, port)?, random_uid());
        let endpoint = SingletonEndpoint::new(address.clone());
        let transport = network.bind(address.clone(), Arc::new(endpoint.clone()));
        let cluster = hub.join(address.clone(), HashSet::default());
        let cluster_listener = spawn_actor(format!("cluster_listener@{}", address.socket_addr_with_uid()), ClusterListener::new(cluster.clone()));
        let singleton = ClusterSingleton::new(cluster.clone(), Arc::new(transport), endpoint)?;
        let manager = singleton.init(PingPongSingleton::props(), (&config.singleton).into())?;
        let proxy = singleton.proxy((&config.singleton_proxy).into());
        let mut aware = SingletonAware::new(proxy.clone(), tick_interval);
        if let Some(listener) = listener {
            aware = aware.with_listener(listener);
        }
        let aware = spawn_actor(format!("singleton_aware@{}", address.socket_addr_with_uid()), aware);
        info!("node {} started", address);
        let node = Self {
            address,
            cluster,
            manager,
            proxy,
            aware,
            listener: cluster_listener,
        };
        Ok(node)
    }

    /// Leave the cluster after handing the singleton over.
    pub async fn shutdown(&self) {
        self.aware.stop();
        if let Err(error) = self.manager.request_shutdown().await {
            warn!("node {} shutdown singleton manager error {:?}", self.address, error);
        }
        self.manager.stop();
        self.proxy.stop();
        self.listener.stop();
        self.cluster.shutdown();
        info!("node {} left", self.address);
    }

    /// Stop everything without telling anyone, then let the membership notice: first as
    /// unreachable, later as downed.
    pub async fn crash(&self, hub: &MembershipHub, network: &LocalNetwork, down_after: Duration) {
        warn!("node {} crash", self.address);
        self.aware.stop();
        self.manager.stop();
        self.proxy.stop();
        self.listener.stop();
        network.unbind(&self.address);
        self.cluster.shutdown();
        hub.unreachable(&self.address);
        tokio::time::sleep(down_after).await;
        hub.down(&self.address);
    }
}

/// `port` if nothing is bound there yet, or a random free port for 0.
fn free_address(network: &LocalNetwork, port: u16) -> anyhow::Result<Address> {
    if port != 0 {
        let address = Address::new(SYSTEM_NAME, "127.0.0.1", port);
        if network.is_bound(&address) {
            bail!("port {} already in use", port);
        }
        return Ok(address);
    }
    let mut rng = rand::thread_rng();
    for _ in 0..RANDOM_PORT_ATTEMPTS {
        let address = Address::new(SYSTEM_NAME, "127.0.0.1", rng.gen_range(30000..60000));
        if !network.is_bound(&address) {
            return Ok(address);
        }
    }
    bail!("no free port after {} attempts", RANDOM_PORT_ATTEMPTS)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ahash::HashSet;

    use actor_cluster::membership_hub::MembershipHub;
    use actor_cluster_tools::config::ClusterToolsConfigBuilder;
    use actor_core::config::ConfigBuilder;
    use actor_remote::transport::local_network::LocalNetwork;

    use crate::node::DemoNode;

    #[tokio::test]
    async fn test_ports_are_never_shared() -> anyhow::Result<()> {
        let config = ClusterToolsConfigBuilder::default().build()?;
        let hub = MembershipHub::new();
        let network = LocalNetwork::new();
        let tick = Duration::from_secs(60);
        let first = DemoNode::start(&hub, &network, 2551, &config, tick, None)?;
        assert!(DemoNode::start(&hub, &network, 2551, &config, tick, None).is_err());
        let mut addresses = HashSet::default();
        addresses.insert(first.address.address.clone());
        for _ in 0..16 {
            let node = DemoNode::start(&hub, &network, 0, &config, tick, None)?;
            assert!(addresses.insert(node.address.address.clone()));
        }
        Ok(())
    }
}
