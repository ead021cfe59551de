use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;

const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Bounded retry policy with a fixed delay between attempts.
///
/// `retries` counts additional attempts, so `retries = 2` allows three calls in
/// total. The delay never grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default)]
    pub retries: u32,
    #[serde(
        default = "default_delay",
        rename = "retry_delay_ms",
        with = "duration_millis"
    )]
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy that performs a single attempt.
    pub fn none() -> Self {
        Self::default()
    }

    /// Policy with `retries` additional attempts separated by `delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use one_llm::http::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(2, Duration::from_millis(250));
    /// assert_eq!(policy.max_attempts(), 3);
    /// ```
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Total number of attempts the policy permits.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            delay: default_delay(),
        }
    }
}

fn default_delay() -> Duration {
    Duration::from_millis(DEFAULT_RETRY_DELAY_MS)
}

/// Runs `operation` until it succeeds or the policy is exhausted.
///
/// Only failures for which [`LLMError::is_retryable`] holds are retried; the failure of
/// the last attempt is returned unchanged.
pub(crate) async fn retry_with_policy<F, Fut, T>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, LLMError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LLMError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts() => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "request attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy(retries: u32) -> RetryPolicy {
        RetryPolicy::new(retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_with_two_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = retry_with_policy(fast_policy(2), move |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(LLMError::transport(format!("attempt {attempt} failed")))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .expect("third attempt should succeed");

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_last_failure_when_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let err = retry_with_policy(fast_policy(2), move |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(LLMError::transport(format!("attempt {attempt} failed")))
            }
        })
        .await
        .expect_err("all attempts fail");

        match err {
            LLMError::Transport { message } => assert_eq!(message, "attempt 3 failed"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_performs_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = retry_with_policy(RetryPolicy::none(), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(LLMError::transport("boom"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn configuration_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let err = retry_with_policy(fast_policy(3), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(LLMError::Validation {
                    message: "failed to serialize request".to_string(),
                })
            }
        })
        .await
        .expect_err("validation fails");

        assert!(matches!(err, LLMError::Validation { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn policy_deserializes_delay_in_millis() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"retries":2,"retry_delay_ms":250}"#).expect("policy");
        assert_eq!(policy, RetryPolicy::new(2, Duration::from_millis(250)));

        let defaulted: RetryPolicy = serde_json::from_str("{}").expect("policy");
        assert_eq!(defaulted.retries, 0);
        assert_eq!(defaulted.delay, Duration::from_millis(1000));
    }
}
