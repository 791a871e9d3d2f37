use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Human friendly duration used in toml configs, e.g. `{ seconds = 1, milliseconds = 500 }`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConfigDuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    milliseconds: Option<u64>,
}

impl ConfigDuration {
    pub fn to_std_duration(&self) -> Duration {
        let minutes = self.minutes.unwrap_or(0);
        let seconds = self.seconds.unwrap_or(0);
        let milliseconds = self.milliseconds.unwrap_or(0);
        Duration::from_secs(minutes * 60 + seconds) + Duration::from_millis(milliseconds)
    }

    pub fn from_millis(millis: u64) -> Self {
        Self {
            milliseconds: Some(millis),
            ..Default::default()
        }
    }
}

impl From<Duration> for ConfigDuration {
    fn from(value: Duration) -> Self {
        Self::from_millis(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<ConfigDuration> for Duration {
    fn from(value: ConfigDuration) -> Self {
        value.to_std_duration()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;

    use crate::util::duration::ConfigDuration;

    #[derive(Debug, Deserialize)]
    struct Timeouts {
        retry: ConfigDuration,
    }

    #[test]
    fn test_parse_mixed_units() -> anyhow::Result<()> {
        let timeouts: Timeouts = toml::from_str("retry = { seconds = 1, milliseconds = 500 }")?;
        assert_eq!(timeouts.retry.to_std_duration(), Duration::from_millis(1500));
        let timeouts: Timeouts = toml::from_str("retry = { minutes = 2 }")?;
        assert_eq!(Duration::from(timeouts.retry), Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn test_huge_duration_saturates() {
        let config = ConfigDuration::from(Duration::MAX);
        assert_eq!(config.milliseconds, Some(u64::MAX));
        let config = ConfigDuration::from(Duration::from_millis(1500));
        assert_eq!(config.to_std_duration(), Duration::from_millis(1500));
    }
}
