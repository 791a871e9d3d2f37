use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::config::singleton_config::SingletonConfig;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ClusterSingletonManagerSettings {
    #[builder(default = "singleton".to_string(), setter(into))]
    pub singleton_name: String,
    /// Only members with this role host the singleton.
    #[builder(default, setter(strip_option, into))]
    pub role: Option<String>,
    #[builder(default = Duration::from_secs(1))]
    pub hand_over_retry_interval: Duration,
    /// Unanswered `HandOverToMe` attempts between two warnings. The new leader keeps asking
    /// until the previous one answers or is Down, Exiting or removed.
    #[builder(default = 15)]
    pub max_hand_over_retries: u32,
    #[builder(default = Duration::from_secs(10))]
    pub start_timeout: Duration,
    #[builder(default = Duration::from_secs(10))]
    pub stop_timeout: Duration,
    /// How long a node that failed to start the instance stays out of the election.
    #[builder(default = Duration::from_secs(5))]
    pub cooldown: Duration,
    #[builder(default = 1024)]
    pub dedup_capacity: usize,
}

impl Default for ClusterSingletonManagerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&SingletonConfig> for ClusterSingletonManagerSettings {
    fn from(config: &SingletonConfig) -> Self {
        Self {
            singleton_name: config.singleton_name.clone(),
            role: config.role.clone(),
            hand_over_retry_interval: config.hand_over_retry_interval.to_std_duration(),
            max_hand_over_retries: config.max_hand_over_retries,
            start_timeout: config.start_timeout.to_std_duration(),
            stop_timeout: config.stop_timeout.to_std_duration(),
            cooldown: config.cooldown.to_std_duration(),
            dedup_capacity: config.dedup_capacity,
        }
    }
}
