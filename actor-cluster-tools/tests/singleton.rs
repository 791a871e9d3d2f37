use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;
use tracing::Level;

use actor_cluster::membership_event::MembershipEvent;
use actor_cluster::membership_hub::MembershipHub;
use actor_cluster_tools::singleton::cluster_singleton_manager::cluster_singleton_manager_settings::ClusterSingletonManagerSettings;
use actor_cluster_tools::singleton::cluster_singleton_proxy::cluster_singleton_proxy_settings::ClusterSingletonProxySettings;
use actor_cluster_tools::singleton::error::SingletonError;
use actor_cluster_tools::singleton::lifecycle::{LifecycleEvent, LifecycleState};
use actor_core::ext::{encode_bytes, init_logger};
use actor_remote::transport::local_network::LocalNetwork;

use crate::common::{count, counter_props, CounterRequest, detached_node, failing_props, incr, Liveness, manager_settings, proxy_settings, start_node, wait_state};

mod common;

#[ctor::ctor]
fn init() {
    init_logger(Level::DEBUG)
}

const STATE_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::test]
async fn test_oldest_node_hosts_singleton() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let manager_a = a.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    let mut events = manager_a.subscribe();
    let manager_b = b.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    assert!(matches!(events.recv().await?, LifecycleEvent::BecameLeader { .. }));
    assert_eq!(events.recv().await?, LifecycleEvent::InstanceStarted);
    let proxy = b.singleton.proxy(proxy_settings());
    assert_eq!(count(&proxy.send(incr()).await?), 1);
    assert_eq!(count(&proxy.send(incr()).await?), 2);
    assert_eq!(manager_b.state(), LifecycleState::Idle);
    assert_eq!(liveness.max(), 1);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_manager_rejected() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let _manager = a.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    assert!(a.singleton.init(counter_props(liveness), manager_settings()).is_err());
    Ok(())
}

#[tokio::test]
async fn test_proxy_orders_requests_across_failover() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let c = start_node(&hub, &network, 2553, &[])?;
    let manager_a = a.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    let manager_b = b.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    let manager_c = c.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    let proxy = c.singleton.proxy(proxy_settings());
    assert_eq!(count(&proxy.send(incr()).await?), 1);
    let (r1, r2, r3, _) = tokio::join!(
        proxy.send(incr()),
        proxy.send(incr()),
        proxy.send(incr()),
        async {
            network.partition(&a.address.address, &b.address.address);
            network.partition(&a.address.address, &c.address.address);
            hub.unreachable(&a.address);
            tokio::time::sleep(Duration::from_millis(300)).await;
            hub.down(&a.address);
        },
    );
    assert_eq!(count(&r1?), 1);
    assert_eq!(count(&r2?), 2);
    assert_eq!(count(&r3?), 3);
    assert_eq!(manager_a.state(), LifecycleState::Idle);
    assert_eq!(manager_b.state(), LifecycleState::Active);
    assert_eq!(manager_c.state(), LifecycleState::Idle);
    assert_eq!(liveness.max(), 1);
    Ok(())
}

#[tokio::test]
async fn test_crashed_leader_blocks_take_over_until_down() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let manager_a = a.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    let manager_b = b.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    let mut events = manager_b.subscribe();
    manager_a.stop();
    network.unbind(&a.address);
    a.cluster.shutdown();
    hub.unreachable(&a.address);
    let settings = manager_settings();
    tokio::time::sleep(settings.hand_over_retry_interval * settings.max_hand_over_retries * 2).await;
    assert_eq!(manager_b.state(), LifecycleState::Idle);
    assert_eq!(liveness.current(), 0);
    assert!(matches!(events.recv().await?, LifecycleEvent::BecameLeader { .. }));
    hub.down(&a.address);
    wait_state(&manager_b, LifecycleState::Active, STATE_TIMEOUT).await?;
    assert_eq!(events.recv().await?, LifecycleEvent::InstanceStarted);
    let proxy = b.singleton.proxy(proxy_settings());
    assert_eq!(count(&proxy.send(incr()).await?), 1);
    Ok(())
}

#[tokio::test]
async fn test_partitioned_leader_keeps_singleton() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let manager_a = a.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    let manager_b = b.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    network.partition(&a.address.address, &b.address.address);
    b.cluster.apply(MembershipEvent::NodeUnreachable { node: a.address.clone() });
    let settings = manager_settings();
    tokio::time::sleep(settings.hand_over_retry_interval * settings.max_hand_over_retries * 2).await;
    assert_eq!(manager_a.state(), LifecycleState::Active);
    assert_eq!(manager_b.state(), LifecycleState::Idle);
    assert_eq!(liveness.max(), 1);
    Ok(())
}

#[tokio::test]
async fn test_take_over_from_me_skips_hand_over_retries() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let slow_retry = ClusterSingletonManagerSettings::builder()
        .singleton_name("counter")
        .hand_over_retry_interval(Duration::from_secs(10))
        .max_hand_over_retries(30)
        .build();
    let manager_a = a.singleton.init(counter_props(liveness.clone()), slow_retry.clone())?;
    let manager_b = b.singleton.init(counter_props(liveness.clone()), slow_retry)?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    b.cluster.apply(MembershipEvent::NodeUnreachable { node: a.address.clone() });
    wait_state(&manager_b, LifecycleState::Active, Duration::from_secs(2)).await?;
    assert_eq!(manager_a.state(), LifecycleState::Idle);
    assert_eq!(liveness.max(), 1);
    assert_eq!(liveness.started(), 2);
    Ok(())
}

#[tokio::test]
async fn test_yield_ends_when_claimant_hands_back() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let manager_a = a.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    let manager_b = b.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    let mut events = manager_a.subscribe();
    b.cluster.apply(MembershipEvent::NodeUnreachable { node: a.address.clone() });
    wait_state(&manager_b, LifecycleState::Active, STATE_TIMEOUT).await?;
    assert_eq!(manager_a.state(), LifecycleState::Idle);
    assert!(matches!(events.recv().await?, LifecycleEvent::LostLeadership { .. }));
    assert_eq!(events.recv().await?, LifecycleEvent::InstanceStopped);
    b.cluster.apply(MembershipEvent::NodeReachable { node: a.address.clone() });
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    assert!(matches!(events.recv().await?, LifecycleEvent::BecameLeader { .. }));
    assert_eq!(events.recv().await?, LifecycleEvent::InstanceStarted);
    wait_state(&manager_b, LifecycleState::Idle, STATE_TIMEOUT).await?;
    assert_eq!(liveness.max(), 1);
    assert_eq!(liveness.started(), 3);
    Ok(())
}

#[tokio::test]
async fn test_yield_expires_when_hand_back_is_lost() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let short_yield = ClusterSingletonManagerSettings::builder()
        .singleton_name("counter")
        .hand_over_retry_interval(Duration::from_millis(100))
        .cooldown(Duration::from_millis(500))
        .build();
    let manager_a = a.singleton.init(counter_props(liveness.clone()), short_yield.clone())?;
    let manager_b = b.singleton.init(counter_props(liveness.clone()), short_yield)?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    b.cluster.apply(MembershipEvent::NodeUnreachable { node: a.address.clone() });
    wait_state(&manager_b, LifecycleState::Active, STATE_TIMEOUT).await?;
    network.partition(&a.address.address, &b.address.address);
    b.cluster.apply(MembershipEvent::NodeReachable { node: a.address.clone() });
    wait_state(&manager_b, LifecycleState::Idle, STATE_TIMEOUT).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(manager_a.state(), LifecycleState::Idle);
    assert_eq!(liveness.current(), 0);
    network.heal(&a.address.address, &b.address.address);
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    assert_eq!(liveness.max(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unrelated_join_keeps_instance() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let manager_a = a.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    let _manager_b = b.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    let mut events = manager_a.subscribe();
    let generation = a.cluster.state().generation();
    let c = start_node(&hub, &network, 2553, &[])?;
    let _manager_c = c.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(a.cluster.state().generation() > generation);
    assert_eq!(manager_a.state(), LifecycleState::Active);
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(liveness.started(), 1);
    Ok(())
}

#[tokio::test]
async fn test_take_over_immediately_from_downed_leader() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let slow_hand_over = ClusterSingletonManagerSettings::builder()
        .singleton_name("counter")
        .hand_over_retry_interval(Duration::from_secs(1))
        .max_hand_over_retries(30)
        .build();
    let manager_a = a.singleton.init(counter_props(liveness.clone()), slow_hand_over.clone())?;
    let manager_b = b.singleton.init(counter_props(liveness.clone()), slow_hand_over)?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    manager_a.stop();
    network.unbind(&a.address);
    a.cluster.shutdown();
    hub.unreachable(&a.address);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(manager_b.state(), LifecycleState::Idle);
    hub.down(&a.address);
    wait_state(&manager_b, LifecycleState::Active, Duration::from_millis(500)).await?;
    Ok(())
}

#[tokio::test]
async fn test_graceful_shutdown_hands_over() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let manager_a = a.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    let manager_b = b.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    wait_state(&manager_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    let proxy = b.singleton.proxy(proxy_settings());
    assert_eq!(count(&proxy.send(incr()).await?), 1);
    let mut events = manager_a.subscribe();
    manager_a.request_shutdown().await?;
    assert_eq!(manager_a.state(), LifecycleState::Idle);
    assert!(matches!(events.recv().await?, LifecycleEvent::LostLeadership { .. }));
    assert_eq!(events.recv().await?, LifecycleEvent::InstanceStopped);
    wait_state(&manager_b, LifecycleState::Active, STATE_TIMEOUT).await?;
    assert!(!hub.nodes().contains(&a.address));
    assert_eq!(count(&proxy.send(incr()).await?), 1);
    assert_eq!(liveness.max(), 1);
    assert_eq!(liveness.started(), 2);
    Ok(())
}

#[tokio::test]
async fn test_start_failure_cedes_leadership() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let manager_a = a.singleton.init(failing_props(), manager_settings())?;
    let mut events = manager_a.subscribe();
    let manager_b = b.singleton.init(counter_props(liveness.clone()), manager_settings())?;
    wait_state(&manager_b, LifecycleState::Active, STATE_TIMEOUT).await?;
    assert_eq!(manager_a.state(), LifecycleState::Idle);
    assert!(matches!(events.recv().await?, LifecycleEvent::BecameLeader { .. }));
    assert!(matches!(events.recv().await?, LifecycleEvent::InstanceStartFailed { .. }));
    assert!(matches!(events.recv().await?, LifecycleEvent::LostLeadership { .. }));
    assert!(a.cluster.state().is_ceded(&a.address));
    let proxy = a.singleton.proxy(proxy_settings());
    assert_eq!(count(&proxy.send(incr()).await?), 1);
    Ok(())
}

#[tokio::test]
async fn test_role_restricts_hosting() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &["frontend"])?;
    let b = start_node(&hub, &network, 2552, &["backend"])?;
    let settings = ClusterSingletonManagerSettings::builder()
        .singleton_name("counter")
        .role("backend")
        .build();
    let manager_a = a.singleton.init(counter_props(liveness.clone()), settings.clone())?;
    let manager_b = b.singleton.init(counter_props(liveness.clone()), settings)?;
    wait_state(&manager_b, LifecycleState::Active, STATE_TIMEOUT).await?;
    assert_eq!(manager_a.state(), LifecycleState::Idle);
    let proxy_settings = ClusterSingletonProxySettings::builder()
        .singleton_name("counter")
        .role("backend")
        .singleton_identification_interval(Duration::from_millis(50))
        .build();
    let proxy = a.singleton.proxy(proxy_settings);
    assert_eq!(count(&proxy.send(incr()).await?), 1);
    Ok(())
}

#[tokio::test]
async fn test_named_singletons_are_independent() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let first = ClusterSingletonManagerSettings::builder().singleton_name("first").build();
    let second = ClusterSingletonManagerSettings::builder().singleton_name("second").build();
    let first_a = a.singleton.init(counter_props(liveness.clone()), first.clone())?;
    let second_a = a.singleton.init(counter_props(liveness.clone()), second.clone())?;
    let _first_b = b.singleton.init(counter_props(liveness.clone()), first)?;
    let _second_b = b.singleton.init(counter_props(liveness.clone()), second)?;
    wait_state(&first_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    wait_state(&second_a, LifecycleState::Active, STATE_TIMEOUT).await?;
    let first_proxy = b.singleton.proxy(ClusterSingletonProxySettings::builder().singleton_name("first").build());
    let second_proxy = b.singleton.proxy(ClusterSingletonProxySettings::builder().singleton_name("second").build());
    assert_eq!(count(&first_proxy.send(incr()).await?), 1);
    assert_eq!(count(&first_proxy.send(incr()).await?), 2);
    assert_eq!(count(&second_proxy.send(incr()).await?), 1);
    assert_eq!(liveness.current(), 2);
    Ok(())
}

#[tokio::test]
async fn test_idempotency_key_answers_from_cache() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let manager = a.singleton.init(counter_props(liveness), manager_settings())?;
    wait_state(&manager, LifecycleState::Active, STATE_TIMEOUT).await?;
    let proxy = a.singleton.proxy(proxy_settings());
    let key = Some("order-42".to_string());
    assert_eq!(count(&proxy.send_with_key(incr(), key.clone()).await?), 1);
    assert_eq!(count(&proxy.send_with_key(incr(), key).await?), 1);
    assert_eq!(count(&proxy.send(incr()).await?), 2);
    Ok(())
}

#[tokio::test]
async fn test_singleton_failure_reaches_caller() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let manager = a.singleton.init(counter_props(liveness), manager_settings())?;
    wait_state(&manager, LifecycleState::Active, STATE_TIMEOUT).await?;
    let proxy = a.singleton.proxy(proxy_settings());
    let result = proxy.send(encode_bytes(&CounterRequest::Fail)?).await;
    assert!(matches!(result, Err(SingletonError::Remote(_))));
    assert_eq!(count(&proxy.send(incr()).await?), 1);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_target_after_delivery_attempts() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let liveness = Arc::new(Liveness::default());
    let a = start_node(&hub, &network, 2551, &[])?;
    let b = start_node(&hub, &network, 2552, &[])?;
    let manager = a.singleton.init(counter_props(liveness), manager_settings())?;
    wait_state(&manager, LifecycleState::Active, STATE_TIMEOUT).await?;
    let settings = ClusterSingletonProxySettings::builder()
        .singleton_name("counter")
        .singleton_identification_interval(Duration::from_millis(50))
        .delivery_timeout(Duration::from_millis(200))
        .max_delivery_attempts(2)
        .request_timeout(Duration::from_secs(5))
        .build();
    let proxy = b.singleton.proxy(settings);
    let result = proxy.send(encode_bytes(&CounterRequest::Slow(400))?).await;
    assert_eq!(result, Err(SingletonError::UnreachableTarget { target: Some(a.address.clone()), attempts: 2 }));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(count(&proxy.send(incr()).await?), 1);
    Ok(())
}

#[tokio::test]
async fn test_request_times_out_without_leader() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let lonely = detached_node(&hub, &network, 2551)?;
    let settings = ClusterSingletonProxySettings::builder()
        .singleton_name("counter")
        .request_timeout(Duration::from_millis(300))
        .build();
    let proxy = lonely.singleton.proxy(settings);
    let result = proxy.send(incr()).await;
    assert_eq!(result, Err(SingletonError::RoutingTimeout(Duration::from_millis(300))));
    Ok(())
}

#[tokio::test]
async fn test_buffer_overflow_fails_oldest() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let lonely = detached_node(&hub, &network, 2551)?;
    let settings = ClusterSingletonProxySettings::builder()
        .singleton_name("counter")
        .buffer_size(2)
        .request_timeout(Duration::from_millis(300))
        .build();
    let proxy = lonely.singleton.proxy(settings);
    let (r1, r2, r3) = tokio::join!(proxy.send(incr()), proxy.send(incr()), proxy.send(incr()));
    assert_eq!(r1, Err(SingletonError::BufferOverflow(2)));
    assert_eq!(r2, Err(SingletonError::RoutingTimeout(Duration::from_millis(300))));
    assert_eq!(r3, Err(SingletonError::RoutingTimeout(Duration::from_millis(300))));
    Ok(())
}

#[tokio::test]
async fn test_stopped_proxy_fails_pending_requests() -> anyhow::Result<()> {
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let lonely = detached_node(&hub, &network, 2551)?;
    let proxy = lonely.singleton.proxy(proxy_settings());
    let (result, _) = tokio::join!(proxy.send(incr()), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        proxy.stop();
    });
    assert_eq!(result, Err(SingletonError::ProxyTerminated));
    Ok(())
}
