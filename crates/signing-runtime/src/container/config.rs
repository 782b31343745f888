//! # Runtime Configuration
//!
//! Configuration for every stage and the control plane.
//!
//! All values have defaults suitable for a single-process deployment and can
//! be overridden from `SG_*` environment variables. Call
//! [`RuntimeConfig::validate`] before building the container.

use rs_02_batch_allocator::AllocatorConfig;
use rs_03_key_registry::{LeasePolicy, LeasePollPolicy};
use shared_bus::BusConfig;
use signing_telemetry::TelemetryConfig;
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Message bus configuration.
    pub bus: BusConfig,
    /// Batch allocator configuration.
    pub allocator: AllocatorConfig,
    /// Key registry and control plane configuration.
    pub registry: RegistryConfig,
    /// Key lease polling policy used by the signer.
    pub lease: LeasePollPolicy,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
}

/// Key registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Control-plane bind address.
    pub listen: SocketAddr,
    /// Base URL of a remote registry. When set the signer leases over HTTP
    /// instead of calling the local registry.
    pub remote_url: Option<String>,
    /// Leases older than this may be reclaimed. Disabled when `None`.
    pub lease_ttl: Option<Duration>,
    /// Keys generated at startup.
    pub seed_keys: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            remote_url: None,
            lease_ttl: None,
            seed_keys: 4,
        }
    }
}

impl RegistryConfig {
    pub fn lease_policy(&self) -> LeasePolicy {
        LeasePolicy {
            lease_ttl: self.lease_ttl,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("{var}={value:?} is not valid: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// The assembled configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl RuntimeConfig {
    /// Defaults overridden by `SG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            telemetry: TelemetryConfig::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(size) = parse(&lookup, "SG_MAX_BATCH_SIZE")? {
            config.allocator.max_batch_size = size;
        }
        if let Some(ms) = parse::<u64>(&lookup, "SG_ACK_TIMEOUT_MS")? {
            config.bus.ack_timeout = Some(Duration::from_millis(ms));
        }

        if let Some(listen) = parse(&lookup, "SG_REGISTRY_LISTEN")? {
            config.registry.listen = listen;
        }
        if let Some(url) = lookup("SG_REGISTRY_URL").filter(|url| !url.trim().is_empty()) {
            config.registry.remote_url = Some(url);
        }
        if let Some(secs) = parse::<u64>(&lookup, "SG_LEASE_TTL_SECS")? {
            config.registry.lease_ttl = Some(Duration::from_secs(secs));
        }
        if let Some(count) = parse(&lookup, "SG_SEED_KEYS")? {
            config.registry.seed_keys = count;
        }

        if let Some(ms) = parse::<u64>(&lookup, "SG_LEASE_INITIAL_DELAY_MS")? {
            config.lease.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "SG_LEASE_MAX_DELAY_MS")? {
            config.lease.max_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse(&lookup, "SG_LEASE_MAX_ATTEMPTS")? {
            config.lease.max_attempts = Some(attempts);
        }

        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the batch size cap is zero
    /// - the ack timeout or lease TTL is zero
    /// - the lease poll policy is inconsistent
    /// - the remote registry URL is not http(s)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allocator.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "max batch size must be at least 1".to_string(),
            ));
        }
        if self.bus.ack_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid("ack timeout must be non-zero".to_string()));
        }
        if self.registry.lease_ttl == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid("lease TTL must be non-zero".to_string()));
        }
        if let Some(url) = &self.registry.remote_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "registry URL {url:?} must start with http:// or https://"
                )));
            }
        }
        self.lease
            .validate()
            .map_err(|reason| ConfigError::Invalid(format!("lease poll policy: {reason}")))
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidVar {
                var,
                reason: e.to_string(),
                value,
            }),
    }
}
