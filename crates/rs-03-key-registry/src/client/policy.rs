//! Poll policy for lease acquisition.
//!
//! The delay before attempt `n` (zero based) is
//! `initial_delay * multiplier^n`, capped at `max_delay`, minus a random
//! jitter of up to 10% so a fleet of signers does not poll in lockstep.

use rand::Rng;
use std::time::Duration;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Largest fraction of a delay removed as jitter.
const JITTER_FRACTION: f64 = 0.10;

#[derive(Debug, Clone, PartialEq)]
pub struct LeasePollPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// `None` polls until a key is leased or the caller cancels.
    pub max_attempts: Option<u32>,
}

impl Default for LeasePollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: None,
        }
    }
}

impl LeasePollPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Checks the policy for values that would make polling spin or stall.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_delay.is_zero() {
            return Err("lease initial_delay must be positive".to_string());
        }
        if self.max_delay < self.initial_delay {
            return Err(format!(
                "lease max_delay ({:?}) is below initial_delay ({:?})",
                self.max_delay, self.initial_delay
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(format!(
                "lease multiplier must be a finite value >= 1.0, got {}",
                self.multiplier
            ));
        }
        if self.max_attempts == Some(0) {
            return Err("lease max_attempts must be positive when set".to_string());
        }
        Ok(())
    }

    /// Backoff before retry number `attempt`, without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // f64::min discards NaN and clamps an overflowed infinity
        let capped = secs.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }

    /// Backoff before retry number `attempt`, jittered downwards.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = rand::thread_rng().gen_range(0.0..=JITTER_FRACTION);
        base.mul_f64(1.0 - jitter)
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}
