#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ahash::HashSet;
use anyhow::bail;
use async_trait::async_trait;
use bincode::{Decode, Encode};

use actor_cluster::cluster::Cluster;
use actor_cluster::membership_hub::MembershipHub;
use actor_cluster_tools::singleton::{Singleton, SingletonProps, SingletonRequest};
use actor_cluster_tools::singleton::cluster_singleton::ClusterSingleton;
use actor_cluster_tools::singleton::cluster_singleton_manager::ClusterSingletonManagerRef;
use actor_cluster_tools::singleton::cluster_singleton_manager::cluster_singleton_manager_settings::ClusterSingletonManagerSettings;
use actor_cluster_tools::singleton::cluster_singleton_proxy::cluster_singleton_proxy_settings::ClusterSingletonProxySettings;
use actor_cluster_tools::singleton::lifecycle::LifecycleState;
use actor_cluster_tools::singleton::singleton_endpoint::SingletonEndpoint;
use actor_core::actor::address::{Address, UniqueAddress};
use actor_core::ext::{decode_bytes, encode_bytes, random_uid};
use actor_remote::transport::local_network::LocalNetwork;

pub const SYSTEM: &str = "singleton-test";

pub struct TestNode {
    pub address: UniqueAddress,
    pub cluster: Cluster,
    pub singleton: ClusterSingleton,
}

pub fn node_address(port: u16) -> UniqueAddress {
    UniqueAddress::new(Address::new(SYSTEM, "127.0.0.1", port), random_uid())
}

fn attach(network: &LocalNetwork, address: UniqueAddress, cluster: Cluster) -> anyhow::Result<TestNode> {
    let endpoint = SingletonEndpoint::new(address.clone());
    let transport = network.bind(address.clone(), Arc::new(endpoint.clone()));
    let singleton = ClusterSingleton::new(cluster.clone(), Arc::new(transport), endpoint)?;
    Ok(TestNode {
        address,
        cluster,
        singleton,
    })
}

/// Join `hub` as a new Up member listening on `network`.
pub fn start_node(hub: &MembershipHub, network: &LocalNetwork, port: u16, roles: &[&str]) -> anyhow::Result<TestNode> {
    let address = node_address(port);
    let roles = roles.iter().map(|r| r.to_string()).collect::<HashSet<_>>();
    let cluster = hub.join(address.clone(), roles);
    attach(network, address, cluster)
}

/// A node that is reachable on `network` but never joined the membership.
pub fn detached_node(hub: &MembershipHub, network: &LocalNetwork, port: u16) -> anyhow::Result<TestNode> {
    let address = node_address(port);
    let cluster = Cluster::new(address.clone(), HashSet::default(), Arc::new(hub.clone()));
    attach(network, address, cluster)
}

pub fn manager_settings() -> ClusterSingletonManagerSettings {
    ClusterSingletonManagerSettings::builder()
        .singleton_name("counter")
        .hand_over_retry_interval(Duration::from_millis(100))
        .max_hand_over_retries(5)
        .start_timeout(Duration::from_secs(1))
        .stop_timeout(Duration::from_secs(1))
        .cooldown(Duration::from_secs(5))
        .build()
}

pub fn proxy_settings() -> ClusterSingletonProxySettings {
    ClusterSingletonProxySettings::builder()
        .singleton_name("counter")
        .singleton_identification_interval(Duration::from_millis(50))
        .request_timeout(Duration::from_secs(5))
        .delivery_timeout(Duration::from_millis(300))
        .build()
}

pub async fn wait_state(manager: &ClusterSingletonManagerRef, state: LifecycleState, timeout: Duration) -> anyhow::Result<()> {
    let mut rx = manager.watch_state();
    let outcome = match tokio::time::timeout(timeout, rx.wait_for(|s| *s == state)).await {
        Ok(result) => {
            result?;
            Ok(())
        }
        Err(_) => bail!("manager still {} after {:?}, expect {}", manager.state(), timeout, state),
    };
    outcome
}

#[derive(Debug, Encode, Decode)]
pub enum CounterRequest {
    Incr,
    Fail,
    /// Answer the current count after sleeping this many milliseconds.
    Slow(u64),
}

/// Number of counter instances alive across the whole test cluster.
#[derive(Debug, Default)]
pub struct Liveness {
    current: AtomicUsize,
    max: AtomicUsize,
    started: AtomicUsize,
}

impl Liveness {
    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

pub struct CounterSingleton {
    count: u64,
    liveness: Arc<Liveness>,
}

#[async_trait]
impl Singleton for CounterSingleton {
    async fn started(&mut self) -> anyhow::Result<()> {
        let current = self.liveness.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.liveness.max.fetch_max(current, Ordering::SeqCst);
        self.liveness.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle(&mut self, request: SingletonRequest) -> anyhow::Result<Vec<u8>> {
        match decode_bytes::<CounterRequest>(&request.payload)? {
            CounterRequest::Incr => {
                self.count += 1;
                encode_bytes(&self.count)
            }
            CounterRequest::Fail => bail!("counter refused request {}", request.correlation_id),
            CounterRequest::Slow(millis) => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                encode_bytes(&self.count)
            }
        }
    }

    async fn stopped(&mut self) -> anyhow::Result<()> {
        self.liveness.current.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn counter_props(liveness: Arc<Liveness>) -> SingletonProps {
    SingletonProps::new(move || {
        Ok(CounterSingleton {
            count: 0,
            liveness: liveness.clone(),
        })
    })
}

pub fn failing_props() -> SingletonProps {
    SingletonProps::new(|| -> anyhow::Result<CounterSingleton> {
        bail!("counter storage unavailable")
    })
}

pub fn incr() -> Vec<u8> {
    encode_bytes(&CounterRequest::Incr).unwrap()
}

pub fn count(response: &[u8]) -> u64 {
    decode_bytes::<u64>(response).unwrap()
}
