//! Exponential backoff for ledger HTTP calls.
//!
//! Only transport failures (no response received) are retried. A response
//! with any status, including 5xx, is returned to the caller as-is: the
//! ledger may have applied the write, so replaying it is not safe.
//!
//! Writes are narrower still. A write that timed out or lost its connection
//! mid-flight may already be on the ledger, so [`Replay::ConnectOnly`]
//! retries only when the connection was never established.

use std::time::Duration;

/// Which transport failures a call may be replayed after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Replay {
    /// Reads: any transport failure.
    AnyTransport,
    /// Writes: only failures to connect.
    ConnectOnly,
}

impl Replay {
    fn allows(self, e: &reqwest::Error) -> bool {
        match self {
            Self::AnyTransport => true,
            Self::ConnectOnly => e.is_connect(),
        }
    }
}

/// Retry schedule. Default: 3 retries at 200ms, 400ms, 800ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Longest one call can take when every attempt runs to
    /// `request_timeout`: all attempts plus all backoff sleeps.
    pub fn worst_case(&self, request_timeout: Duration) -> Duration {
        let attempts = request_timeout.saturating_mul(self.max_retries.saturating_add(1));
        (0..self.max_retries)
            .map(|attempt| self.delay_for(attempt))
            .fold(attempts, Duration::saturating_add)
    }
}

/// Send a request, retrying transport errors per `policy` and `replay`.
///
/// `f` is called at most `max_retries + 1` times.
pub(crate) async fn retry_send<F, Fut>(
    policy: RetryPolicy,
    replay: Replay,
    endpoint: &str,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) if attempt < policy.max_retries && replay.allows(&e) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    endpoint,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    error = %e,
                    "ledger request failed, retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn default_schedule_doubles() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(0), Duration::from_millis(200));
        assert_eq!(p.delay_for(1), Duration::from_millis(400));
        assert_eq!(p.delay_for(2), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn exhausts_attempts_on_transport_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let result = retry_send(policy, Replay::AnyTransport, "GET /", || {
            let calls = calls.clone();
            let client = client.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                // Closed port: connection refused.
                client.get("http://127.0.0.1:1/").send().await
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn writes_still_retry_refused_connections() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        };
        let client = reqwest::Client::new();

        let result = retry_send(policy, Replay::ConnectOnly, "POST /", || {
            let calls = calls.clone();
            let client = client.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                client.post("http://127.0.0.1:1/").send().await
            }
        })
        .await;

        assert!(result.unwrap_err().is_connect());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn worst_case_adds_attempts_and_backoff() {
        let p = RetryPolicy::default();
        // 4 attempts of 10s, then 200 + 400 + 800 ms of sleep.
        assert_eq!(
            p.worst_case(Duration::from_secs(10)),
            Duration::from_millis(41_400)
        );
        assert_eq!(
            RetryPolicy::none().worst_case(Duration::from_secs(3)),
            Duration::from_secs(3)
        );
    }
}
