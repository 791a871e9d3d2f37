use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use actor_cluster::membership_hub::MembershipHub;
use actor_cluster_tools::config::ClusterToolsConfigBuilder;
use actor_cluster_tools::singleton::lifecycle::LifecycleState;
use actor_core::config::ConfigBuilder;
use actor_core::ext::init_logger_with_filter;
use actor_remote::transport::local_network::LocalNetwork;
use actor_singleton_demo::node::DemoNode;

#[derive(Parser, Debug)]
struct Args {
    /// Ports of the nodes to start, 0 picks a random port.
    #[arg(default_values_t = [2551u16, 2552, 0])]
    ports: Vec<u16>,
    /// Seconds between two pings of every node.
    #[arg(short, long, default_value_t = 5)]
    tick: u64,
    /// Crash the node hosting the singleton after this many seconds.
    #[arg(short, long)]
    crash_after: Option<u64>,
    /// Seconds a crashed node stays unreachable before it is downed.
    #[arg(short, long, default_value_t = 10)]
    down_after: u64,
    /// TOML file overriding the singleton defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Args { ports, tick, crash_after, down_after, config: config_file } = Args::parse();
    init_logger_with_filter("info,actor_cluster_tools=debug,actor_singleton_demo=debug");
    let mut builder = ClusterToolsConfigBuilder::default();
    if let Some(config_file) = config_file {
        builder = builder.add_source(config::File::from(config_file))?;
    }
    let tools_config = builder.build()?;
    info!("start cluster on port(s) {:?}", ports);
    let hub = MembershipHub::new();
    let network = LocalNetwork::new();
    let mut nodes = Vec::with_capacity(ports.len());
    for port in ports {
        let node = DemoNode::start(&hub, &network, port, &tools_config, Duration::from_secs(tick), None)?;
        nodes.push(node);
    }
    if let Some(crash_after) = crash_after {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(crash_after)) => {
                match nodes.iter().position(|node| node.manager.state() == LifecycleState::Active) {
                    Some(index) => {
                        let node = nodes.remove(index);
                        node.crash(&hub, &network, Duration::from_secs(down_after)).await;
                    }
                    None => warn!("no node hosts the singleton, nothing to crash"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                shutdown(nodes).await;
                return Ok(());
            }
        }
    }
    tokio::signal::ctrl_c().await?;
    shutdown(nodes).await;
    Ok(())
}

async fn shutdown(nodes: Vec<DemoNode>) {
    info!("shutdown {} node(s)", nodes.len());
    for node in &nodes {
        node.shutdown().await;
    }
}
