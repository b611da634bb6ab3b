//! Lease timing configuration.

use crate::error::{LeaseError, LeaseResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The lease must outlast this many renewal intervals.
pub const MIN_EXPIRY_TO_INTERVAL_RATIO: u32 = 4;

/// Process-wide lease timing.
///
/// Both values are whole seconds on the store side (`EX` / `EXPIRE`), so
/// sub-second parts are ignored when talking to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseLockConfig {
    /// Time between two renewal passes.
    #[serde(with = "duration_secs", default = "default_renewal_interval")]
    pub renewal_interval: Duration,

    /// TTL written to the store on every acquisition and renewal.
    #[serde(with = "duration_secs", default = "default_lease_expiry")]
    pub lease_expiry: Duration,
}

fn default_renewal_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_lease_expiry() -> Duration {
    Duration::from_secs(20)
}

impl Default for LeaseLockConfig {
    fn default() -> Self {
        Self {
            renewal_interval: default_renewal_interval(),
            lease_expiry: default_lease_expiry(),
        }
    }
}

impl LeaseLockConfig {
    /// Create a configuration from an interval and an expiry.
    pub fn new(renewal_interval: Duration, lease_expiry: Duration) -> Self {
        Self {
            renewal_interval,
            lease_expiry,
        }
    }

    /// Create a builder.
    pub fn builder() -> LeaseLockConfigBuilder {
        LeaseLockConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `LEASE_RENEWAL_INTERVAL_SECS` and `LEASE_EXPIRY_SECS`; unset or
    /// unparsable values keep their defaults.
    pub fn from_env() -> LeaseLockConfigBuilder {
        let mut builder = LeaseLockConfigBuilder::new();

        if let Ok(secs) = std::env::var("LEASE_RENEWAL_INTERVAL_SECS")
            && let Ok(secs) = secs.parse()
        {
            builder = builder.renewal_interval(Duration::from_secs(secs));
        }

        if let Ok(secs) = std::env::var("LEASE_EXPIRY_SECS")
            && let Ok(secs) = secs.parse()
        {
            builder = builder.lease_expiry(Duration::from_secs(secs));
        }

        builder
    }

    /// Check the interval/expiry relationship.
    ///
    /// The lease must be strictly longer than four renewal intervals so a few
    /// consecutive failed renewals do not lose it.
    pub fn validate(&self) -> LeaseResult<()> {
        if self.renewal_interval.as_secs() == 0 {
            return Err(LeaseError::config(
                "renewal_interval must be at least one second",
            ));
        }

        // The store only keeps whole seconds of the lease
        let lease_millis = u128::from(self.lease_expiry_secs()) * 1000;
        let floor_millis =
            self.renewal_interval.as_millis() * u128::from(MIN_EXPIRY_TO_INTERVAL_RATIO);
        if lease_millis <= floor_millis {
            return Err(LeaseError::config(format!(
                "lease_expiry is too small ({}s), it must be greater than {}ms",
                self.lease_expiry_secs(),
                floor_millis
            )));
        }

        Ok(())
    }

    /// Lease expiry in whole seconds, as sent to the store.
    pub(crate) fn lease_expiry_secs(&self) -> u64 {
        self.lease_expiry.as_secs()
    }
}

/// Builder for [`LeaseLockConfig`].
#[derive(Default)]
pub struct LeaseLockConfigBuilder {
    config: LeaseLockConfig,
}

impl LeaseLockConfigBuilder {
    /// Create a new builder with default timing.
    pub fn new() -> Self {
        Self {
            config: LeaseLockConfig::default(),
        }
    }

    /// Set the renewal interval.
    pub fn renewal_interval(mut self, interval: Duration) -> Self {
        self.config.renewal_interval = interval;
        self
    }

    /// Set the lease expiry.
    pub fn lease_expiry(mut self, expiry: Duration) -> Self {
        self.config.lease_expiry = expiry;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> LeaseResult<LeaseLockConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
