use std::sync::Arc;

use anyhow::ensure;

use actor_cluster::cluster::Cluster;
use actor_core::actor::cell::spawn_actor;
use actor_remote::transport::Transport;

use crate::singleton::cluster_singleton_manager::{ClusterSingletonManager, ClusterSingletonManagerRef};
use crate::singleton::cluster_singleton_manager::cluster_singleton_manager_settings::ClusterSingletonManagerSettings;
use crate::singleton::cluster_singleton_proxy::{ClusterSingletonProxy, ClusterSingletonProxyRef};
use crate::singleton::cluster_singleton_proxy::cluster_singleton_proxy_settings::ClusterSingletonProxySettings;
use crate::singleton::singleton_endpoint::SingletonEndpoint;
use crate::singleton::SingletonProps;

/// Entry point for singletons on one node: starts managers and proxies wired to the node's
/// cluster membership and transport.
#[derive(Debug, Clone)]
pub struct ClusterSingleton {
    cluster: Cluster,
    transport: Arc<dyn Transport>,
    endpoint: SingletonEndpoint,
}

impl ClusterSingleton {
    /// `endpoint` must be the inbound handler bound for `transport`.
    pub fn new(cluster: Cluster, transport: Arc<dyn Transport>, endpoint: SingletonEndpoint) -> anyhow::Result<Self> {
        ensure!(
            transport.local_address() == &cluster.self_unique_address && endpoint.address() == &cluster.self_unique_address,
            "transport {} and endpoint {} must belong to cluster node {}",
            transport.local_address(),
            endpoint.address(),
            cluster.self_unique_address,
        );
        let singleton = Self {
            cluster,
            transport,
            endpoint,
        };
        Ok(singleton)
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    /// Start the manager of one named singleton on this node.
    pub fn init(&self, props: SingletonProps, settings: ClusterSingletonManagerSettings) -> anyhow::Result<ClusterSingletonManagerRef> {
        let name = format!("singleton_manager_{}@{}", settings.singleton_name, self.cluster.self_unique_address.socket_addr_with_uid());
        let singleton_name = settings.singleton_name.clone();
        ensure!(
            !self.endpoint.is_registered(&singleton_name),
            "singleton manager {} already running on {}",
            singleton_name,
            self.cluster.self_unique_address,
        );
        let (manager, events, state) = ClusterSingletonManager::new(self.cluster.clone(), self.transport.clone(), props, settings);
        let manager = spawn_actor(name, manager);
        if let Err(error) = self.endpoint.register(&singleton_name, manager.clone()) {
            manager.stop();
            return Err(error);
        }
        Ok(ClusterSingletonManagerRef::new(manager, events, state))
    }

    pub fn proxy(&self, settings: ClusterSingletonProxySettings) -> ClusterSingletonProxyRef {
        let name = format!("singleton_proxy_{}@{}", settings.singleton_name, self.cluster.self_unique_address.socket_addr_with_uid());
        let proxy = ClusterSingletonProxy::new(self.cluster.clone(), self.transport.clone(), settings);
        ClusterSingletonProxyRef::new(spawn_actor(name, proxy))
    }
}
