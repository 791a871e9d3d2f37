pub const CLUSTER_TOOLS_CONFIG: &'static str = include_str!("../tools.toml");

pub mod config;
pub mod singleton;
