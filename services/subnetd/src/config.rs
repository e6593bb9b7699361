use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Delay inserted after each published result so progress is
    /// observable from outside. Zero disables pacing.
    pub pace: Duration,
    /// How long finished or failed tasks stay pollable.
    pub task_ttl: Duration,
    /// Cadence of the eviction sweep.
    pub sweep_every: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            std::env::var("SUBNETD_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let pace = Duration::from_millis(env_u64("SUBNETD_PACE_MS", 150)?);
        let task_ttl = Duration::from_secs(env_u64("SUBNETD_TASK_TTL_SECS", 900)?);
        let sweep_every = Duration::from_secs(env_u64("SUBNETD_SWEEP_SECS", 60)?);

        // Fail fast, fail loud
        if sweep_every.is_zero() {
            anyhow::bail!("SUBNETD_SWEEP_SECS must be at least 1");
        }

        Ok(Self {
            bind_addr,
            pace,
            task_ttl,
            sweep_every,
        })
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
