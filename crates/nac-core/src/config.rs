//! Typed configuration
//!
//! Configuration is plain serde data loaded from TOML. Every section has
//! conservative defaults, a `testing()` preset with short deadlines, and a
//! `validate()` that rejects values the protocol cannot work with.

use crate::errors::{NacError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for a NAC process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NacConfig {
    /// Protocol engine settings shared by every role agent
    pub agent: AgentConfig,
    /// Attribute authority settings
    pub authority: AuthorityConfig,
}

impl NacConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NacError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Configuration with short deadlines for tests
    pub fn testing() -> Self {
        Self {
            agent: AgentConfig::testing(),
            authority: AuthorityConfig::default(),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.agent.validate()?;
        self.authority.validate()
    }
}

/// Protocol engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Deadline for a command reply, measured from send time
    pub command_timeout_ms: u64,
    /// How often the reactor sweeps expired pending operations
    pub tick_interval_ms: u64,
    /// Maximum accepted age (and future skew) of a signed command timestamp
    pub freshness_window_ms: u64,
    /// Maximum concurrent blocking ABE jobs
    pub crypto_workers: usize,
    /// Caller-level retry policy used by `request_with_retry`
    pub retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 4_000,
            tick_interval_ms: 100,
            freshness_window_ms: 60_000,
            crypto_workers: 4,
            retry: RetryPolicy::default(),
        }
    }
}

impl AgentConfig {
    /// Short deadlines for tests
    pub fn testing() -> Self {
        Self {
            command_timeout_ms: 500,
            tick_interval_ms: 10,
            freshness_window_ms: 10_000,
            crypto_workers: 2,
            retry: RetryPolicy {
                max_attempts: 3,
                base_backoff_ms: 5,
                max_backoff_ms: 20,
                multiplier: 2.0,
            },
        }
    }

    /// Reply deadline as a `Duration`
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Reactor sweep interval as a `Duration`
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_ms == 0 {
            return Err(NacError::config("command_timeout_ms must be greater than 0"));
        }
        if self.tick_interval_ms == 0 {
            return Err(NacError::config("tick_interval_ms must be greater than 0"));
        }
        if self.tick_interval_ms > self.command_timeout_ms {
            return Err(NacError::config(
                "tick_interval_ms must not exceed command_timeout_ms",
            ));
        }
        if self.freshness_window_ms == 0 {
            return Err(NacError::config("freshness_window_ms must be greater than 0"));
        }
        if self.crypto_workers == 0 {
            return Err(NacError::config("crypto_workers must be greater than 0"));
        }
        self.retry.validate()
    }
}

/// Exponential backoff retry policy applied by callers on timeouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first send; 1 disables retry
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_backoff_ms: u64,
    /// Upper bound on any single delay
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_backoff_ms: 200,
            max_backoff_ms: 5_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.base_backoff_ms as f64 * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Validate retry settings
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(NacError::config("retry.max_attempts must be at least 1"));
        }
        if self.multiplier < 1.0 {
            return Err(NacError::config("retry.multiplier must be >= 1.0"));
        }
        if self.base_backoff_ms > self.max_backoff_ms {
            return Err(NacError::config(
                "retry.base_backoff_ms must not exceed retry.max_backoff_ms",
            ));
        }
        Ok(())
    }
}

/// Attribute authority configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Attributes the authority can issue key shares for
    pub attribute_universe: Vec<String>,
}

impl AuthorityConfig {
    /// Validate authority settings
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for attribute in &self.attribute_universe {
            if attribute.trim().is_empty() {
                return Err(NacError::config("attribute_universe contains an empty attribute"));
            }
            if !seen.insert(attribute.as_str()) {
                return Err(NacError::config(format!(
                    "attribute_universe lists `{attribute}` twice"
                )));
            }
        }
        Ok(())
    }
}
