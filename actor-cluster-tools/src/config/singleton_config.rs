use serde::{Deserialize, Serialize};

use actor_core::util::duration::ConfigDuration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingletonConfig {
    pub singleton_name: String,
    #[serde(default)]
    pub role: Option<String>,
    pub hand_over_retry_interval: ConfigDuration,
    pub max_hand_over_retries: u32,
    pub start_timeout: ConfigDuration,
    pub stop_timeout: ConfigDuration,
    pub cooldown: ConfigDuration,
    pub dedup_capacity: usize,
}
