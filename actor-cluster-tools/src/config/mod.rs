use config::{File, FileFormat, Source};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};

use actor_core::config::ConfigBuilder;

use crate::CLUSTER_TOOLS_CONFIG;
use crate::config::singleton_config::SingletonConfig;
use crate::config::singleton_proxy_config::SingletonProxyConfig;

pub mod singleton_config;
pub mod singleton_proxy_config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterToolsConfig {
    pub singleton: SingletonConfig,
    pub singleton_proxy: SingletonProxyConfig,
}

impl ClusterToolsConfig {
    /// Embedded defaults without any user source.
    pub fn reference() -> anyhow::Result<Self> {
        ClusterToolsConfigBuilder::default().build()
    }
}

#[derive(Debug)]
pub struct ClusterToolsConfigBuilder {
    builder: config::ConfigBuilder<DefaultState>,
}

impl Default for ClusterToolsConfigBuilder {
    fn default() -> Self {
        let builder = config::Config::builder()
            .add_source(File::from_str(CLUSTER_TOOLS_CONFIG, FileFormat::Toml));
        Self { builder }
    }
}

impl ConfigBuilder for ClusterToolsConfigBuilder {
    type C = ClusterToolsConfig;

    fn add_source<T>(self, source: T) -> anyhow::Result<Self> where T: Source + Send + Sync + 'static {
        Ok(Self { builder: self.builder.add_source(source) })
    }

    fn build(self) -> anyhow::Result<Self::C> {
        let cluster_tools_config = self.builder.build()?.try_deserialize::<Self::C>()?;
        Ok(cluster_tools_config)
    }
}
