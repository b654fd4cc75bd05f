//! Retry/backoff configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Backoff policy settings.
///
/// Delay for attempt `n` is `2^(n + exponent_offset) * base_delay_ms`.
/// The bounds below keep every delay within the attempt budget below
/// `u64::MAX` milliseconds, so delays strictly grow with each attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct RetryConfig {
    /// Multiplier applied to the exponential term
    #[validate(range(min = 1_u64, max = 60_000_u64))]
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Added to the attempt number before exponentiation
    #[validate(range(max = 16_u32))]
    #[serde(default = "default_exponent_offset")]
    pub exponent_offset: u32,
    /// Total attempts per logical request, including the first
    #[validate(range(min = 1_u32, max = 32_u32))]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// HTTP statuses that are retried
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_retry_statuses")]
    pub statuses: Vec<u16>,
    /// Retry transient transport failures (timeouts, refused connections)
    #[serde(default = "default_retry_network_errors")]
    pub retry_network_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            exponent_offset: default_exponent_offset(),
            max_attempts: default_max_attempts(),
            statuses: default_retry_statuses(),
            retry_network_errors: default_retry_network_errors(),
        }
    }
}

pub const fn default_base_delay_ms() -> u64 {
    100
}

pub const fn default_exponent_offset() -> u32 {
    4
}

pub const fn default_max_attempts() -> u32 {
    8
}

pub fn default_retry_statuses() -> Vec<u16> {
    vec![500, 503, 504]
}

pub const fn default_retry_network_errors() -> bool {
    true
}
