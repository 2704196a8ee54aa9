//! Engine configuration.
//!
//! All fields have serde defaults so a partial (or absent) config file is
//! always usable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for the tracking engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TrackingConfig {
    /// Retry behavior for optimistic-concurrency conflicts.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Bounds of the workflow lookup cache.
    #[serde(default)]
    pub cache: CachePolicy,
}

impl TrackingConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Bounded retry for the conflict class only. All other errors propagate
/// immediately without retry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryPolicy {
    /// Maximum attempts for a conflicted transfer. Default: 3
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff in milliseconds; doubled per attempt. Default: 50
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on the computed backoff, before jitter. Default: 1000
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Exponential backoff for the given 1-based attempt, capped, plus a
    /// random jitter of up to one base delay.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0..=self.base_delay_ms.max(1));
        Duration::from_millis(delay + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    50
}

fn default_max_delay_ms() -> u64 {
    1000
}

/// TTL and size bounds for the workflow lookup cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CachePolicy {
    /// Entry lifetime in seconds. Default: 180
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum cached entries. Default: 256
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl CachePolicy {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    180
}

fn default_cache_capacity() -> usize {
    256
}
