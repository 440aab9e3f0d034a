use std::ops::RangeInclusive;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    pub interval_secs: u64,
    pub grace_minutes: i64,
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn grace(&self) -> time::Duration {
        time::Duration::minutes(self.grace_minutes)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5 * 60,
            grace_minutes: 150,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://exp.host/--/api/v2/push/send".into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub sweep: SweepConfig,
    pub push: PushConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let sweep = SweepConfig {
            interval_secs: env_or("SWEEP_INTERVAL_SECS", 5 * 60, 1..=MAX_SWEEP_INTERVAL_SECS),
            grace_minutes: env_or("CLAIM_GRACE_MINUTES", 150, 1..=MAX_GRACE_MINUTES),
        };
        let push = PushConfig {
            endpoint: std::env::var("EXPO_PUSH_URL")
                .unwrap_or_else(|_| PushConfig::default().endpoint),
            timeout_secs: env_or("PUSH_TIMEOUT_SECS", 10, 1..=MAX_PUSH_TIMEOUT_SECS),
        };
        Ok(Self {
            database_url,
            sweep,
            push,
        })
    }
}

const MAX_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;
const MAX_GRACE_MINUTES: i64 = 30 * 24 * 60;
const MAX_PUSH_TIMEOUT_SECS: u64 = 5 * 60;

/// Reads `key`, falling back to `default` when it is unset, unparsable or
/// outside `range`.
fn env_or<T>(key: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: std::str::FromStr + PartialOrd + Copy,
{
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(v) if range.contains(&v) => v,
        _ => {
            warn!(key, value = %raw, "invalid value, using default");
            default
        }
    }
}
