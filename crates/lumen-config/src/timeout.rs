//! Resolution of the per-test timeout.
//!
//! Only the value is resolved here; enforcing it belongs to whatever runs
//! the test body.

use std::env;
use std::time::Duration;

use crate::settings::HarnessConfig;

/// Environment variable overriding the configured timeout, in whole
/// seconds.
pub const TEST_TIMEOUT_ENV: &str = "LUMEN_TEST_TIMEOUT";

/// Resolves the timeout from an environment value and the configuration.
///
/// A positive integer in `env_value` wins. Anything else, including zero,
/// negative numbers, and non-numeric text, defers to
/// [`HarnessConfig::test_timeout`].
#[must_use]
pub fn resolve_test_timeout(
    env_value: Option<&str>,
    config: Option<&HarnessConfig>,
) -> Option<Duration> {
    env_value
        .and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|seconds| u64::try_from(seconds).ok())
        .filter(|seconds| *seconds > 0)
        .map(Duration::from_secs)
        .or_else(|| config.and_then(HarnessConfig::test_timeout))
}

/// Resolves the timeout using [`TEST_TIMEOUT_ENV`] from the process
/// environment.
#[must_use]
pub fn test_timeout_from_env(config: Option<&HarnessConfig>) -> Option<Duration> {
    let value = env::var(TEST_TIMEOUT_ENV).ok();
    resolve_test_timeout(value.as_deref(), config)
}
