use std::time::Duration;

use rand::Rng;

use crate::env::{Env, EnvProvider};

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_RETRIES: usize = 0;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds. Zero falls back to the default.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Wait inserted between a 5xx attempt and the next retry.
    pub backoff: BackoffStrategy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffStrategy::default(),
        }
    }
}

impl ClientOptions {
    /// Options with a custom retry count and timeout, default backoff.
    pub fn new(max_retries: usize, timeout: Duration) -> Self {
        Self {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            max_retries,
            ..Self::default()
        }
    }

    /// Reads options from the environment.
    ///
    /// - `HTTP_CLIENT_TIMEOUT_MS`
    /// - `HTTP_CLIENT_MAX_RETRIES`
    /// - `HTTP_CLIENT_RETRY_BACKOFF_MS`: switches to a constant backoff
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env<P: EnvProvider>(env: &Env<P>) -> Self {
        let defaults = Self::default();
        let timeout_ms = env.i64_or("HTTP_CLIENT_TIMEOUT_MS", defaults.timeout_ms as i64);
        let max_retries = env.i64_or("HTTP_CLIENT_MAX_RETRIES", defaults.max_retries as i64);
        let backoff = match env.i64_or("HTTP_CLIENT_RETRY_BACKOFF_MS", -1) {
            delay if delay >= 0 => BackoffStrategy::Constant {
                delay_ms: delay as u64,
            },
            _ => defaults.backoff,
        };

        Self {
            timeout_ms: u64::try_from(timeout_ms).unwrap_or(defaults.timeout_ms),
            max_retries: usize::try_from(max_retries).unwrap_or(defaults.max_retries),
            backoff,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    pub(crate) fn timeout(&self) -> Duration {
        if self.timeout_ms == 0 {
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }
}

/// Strategy for the wait between retry attempts.
///
/// `attempt` passed to [`BackoffStrategy::delay`] is the zero-based index of
/// the attempt that just failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BackoffStrategy {
    /// Retry immediately.
    None,
    /// Same wait before every retry.
    Constant { delay_ms: u64 },
    /// Wait grows by `step_ms` per attempt.
    Linear { step_ms: u64 },
    /// `initial_ms * factor^attempt`, capped at `max_ms`, plus a uniform
    /// jitter in `0..=max_jitter_ms`.
    Exponential {
        initial_ms: u64,
        max_ms: u64,
        factor: u32,
        max_jitter_ms: u64,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            initial_ms: 2,
            max_ms: 9,
            factor: 2,
            max_jitter_ms: 2,
        }
    }
}

impl BackoffStrategy {
    pub fn delay(&self, attempt: usize) -> Duration {
        let delay_ms = match *self {
            Self::None => 0,
            Self::Constant { delay_ms } => delay_ms,
            Self::Linear { step_ms } => step_ms.saturating_mul(attempt as u64 + 1),
            Self::Exponential {
                initial_ms,
                max_ms,
                factor,
                max_jitter_ms,
            } => {
                let exp = attempt.min(32) as u32;
                let base = initial_ms
                    .saturating_mul(u64::from(factor).saturating_pow(exp))
                    .min(max_ms);
                let jitter = if max_jitter_ms == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=max_jitter_ms)
                };
                base.saturating_add(jitter)
            }
        };
        Duration::from_millis(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{BackoffStrategy, ClientOptions};
    use crate::env::{Env, MapEnv};

    #[test]
    fn defaults_match_documented_values() {
        let options = ClientOptions::default();
        assert_eq!(options.timeout_ms, 5_000);
        assert_eq!(options.max_retries, 0);
        assert_eq!(options.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn zero_timeout_uses_default() {
        let options = ClientOptions::default().with_timeout(Duration::ZERO);
        assert_eq!(options.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn constant_and_linear_delays() {
        let constant = BackoffStrategy::Constant { delay_ms: 7 };
        assert_eq!(constant.delay(0), Duration::from_millis(7));
        assert_eq!(constant.delay(5), Duration::from_millis(7));

        let linear = BackoffStrategy::Linear { step_ms: 10 };
        assert_eq!(linear.delay(0), Duration::from_millis(10));
        assert_eq!(linear.delay(2), Duration::from_millis(30));
    }

    #[test]
    fn exponential_delay_is_capped_and_jittered() {
        let strategy = BackoffStrategy::Exponential {
            initial_ms: 2,
            max_ms: 9,
            factor: 2,
            max_jitter_ms: 2,
        };
        for attempt in 0..10 {
            let delay = strategy.delay(attempt).as_millis() as u64;
            let base = (2u64 << attempt.min(10)).min(9);
            assert!(delay >= base && delay <= base + 2, "attempt {attempt}: {delay}");
        }
        assert_eq!(BackoffStrategy::None.delay(3), Duration::ZERO);
    }

    #[test]
    fn from_env_reads_overrides() {
        let env = Env::new(
            MapEnv::new()
                .set("HTTP_CLIENT_TIMEOUT_MS", "250")
                .set("HTTP_CLIENT_MAX_RETRIES", "3")
                .set("HTTP_CLIENT_RETRY_BACKOFF_MS", "15"),
        );
        let options = ClientOptions::from_env(&env);
        assert_eq!(options.timeout_ms, 250);
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.backoff, BackoffStrategy::Constant { delay_ms: 15 });
    }

    #[test]
    fn from_env_ignores_negative_values() {
        let env = Env::new(MapEnv::new().set("HTTP_CLIENT_MAX_RETRIES", "-2"));
        assert_eq!(ClientOptions::from_env(&env), ClientOptions::default());
    }
}
