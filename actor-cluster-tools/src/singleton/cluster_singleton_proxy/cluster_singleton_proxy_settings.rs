use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::config::singleton_proxy_config::SingletonProxyConfig;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ClusterSingletonProxySettings {
    #[builder(default = "singleton".to_string(), setter(into))]
    pub singleton_name: String,
    #[builder(default, setter(strip_option, into))]
    pub role: Option<String>,
    #[builder(default = Duration::from_secs(1))]
    pub singleton_identification_interval: Duration,
    /// Requests kept while no host is known. The oldest buffered request fails once exceeded.
    #[builder(default = 1000)]
    pub buffer_size: usize,
    /// Deadline of a request from `send` to its response.
    #[builder(default = Duration::from_secs(10))]
    pub request_timeout: Duration,
    /// Deadline of a single network round trip.
    #[builder(default = Duration::from_secs(3))]
    pub delivery_timeout: Duration,
    #[builder(default = 5)]
    pub max_delivery_attempts: u32,
}

impl Default for ClusterSingletonProxySettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&SingletonProxyConfig> for ClusterSingletonProxySettings {
    fn from(config: &SingletonProxyConfig) -> Self {
        Self {
            singleton_name: config.singleton_name.clone(),
            role: config.role.clone(),
            singleton_identification_interval: config.singleton_identification_interval.to_std_duration(),
            buffer_size: config.buffer_size,
            request_timeout: config.request_timeout.to_std_duration(),
            delivery_timeout: config.delivery_timeout.to_std_duration(),
            max_delivery_attempts: config.max_delivery_attempts,
        }
    }
}
