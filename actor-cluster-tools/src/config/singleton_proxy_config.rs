use serde::{Deserialize, Serialize};

use actor_core::util::duration::ConfigDuration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingletonProxyConfig {
    pub singleton_name: String,
    #[serde(default)]
    pub role: Option<String>,
    pub singleton_identification_interval: ConfigDuration,
    pub buffer_size: usize,
    pub request_timeout: ConfigDuration,
    pub delivery_timeout: ConfigDuration,
    pub max_delivery_attempts: u32,
}
