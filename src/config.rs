//! Runtime configuration for the optimization engine
//!
//! Layering order: built-in defaults, then an optional `promptforge.toml`,
//! then `PROMPTFORGE_*` environment variables. The config owns everything a
//! deployment tunes: the scorer budget, the advertised model version, the
//! RNG seed (fixed in tests, entropy in production) and retention limits.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model version string reported in optimization records
    pub model_version: String,
    /// Budget for a single scorer call, in milliseconds
    pub scorer_timeout_ms: u64,
    /// Seed for the injected RNG; None seeds from entropy
    pub rng_seed: Option<u64>,
    /// Maximum optimization records retained in the store
    pub retention_capacity: usize,
    /// Maximum performance samples retained by the aggregator
    pub sample_capacity: usize,
    /// HTTP API bind address
    pub api_addr: SocketAddr,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_version: "v2.3.1".to_string(),
            scorer_timeout_ms: 5_000,
            rng_seed: None,
            retention_capacity: 1_000,
            sample_capacity: 365,
            api_addr: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `promptforge.toml` (if present) and
    /// `PROMPTFORGE_*` environment variables layered over defaults.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::with_name("promptforge").required(false))
            .add_source(config::Environment::with_prefix("PROMPTFORGE"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Scorer budget as a `Duration`
    pub fn scorer_timeout(&self) -> Duration {
        Duration::from_millis(self.scorer_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.model_version, "v2.3.1");
        assert_eq!(config.scorer_timeout_ms, 5_000);
        assert!(config.rng_seed.is_none());
        assert_eq!(config.api_addr.port(), 3000);
    }

    #[test]
    fn test_timeout_conversion() {
        let config = EngineConfig {
            scorer_timeout_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.scorer_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_uses_defaults_without_sources() {
        // No promptforge.toml in the test working directory
        let config = EngineConfig::load().expect("defaults should load");
        assert_eq!(config.retention_capacity, 1_000);
    }
}
