use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, NhlApi};
use crate::config::HttpSettings;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total tries, the first one included.
    pub attempts: u32,
    pub delay: Duration,
}

impl From<&HttpSettings> for RetryPolicy {
    fn from(cfg: &HttpSettings) -> Self {
        Self {
            attempts: cfg.attempts.max(1),
            delay: cfg.retry_delay(),
        }
    }
}

/// Runs `op` until it succeeds, retrying only timeouts with a constant delay.
///
/// Any other error is returned at once. Running out of attempts turns the last
/// timeout into [`ApiError::RetriesExhausted`].
pub async fn retry_on_timeout<T, F, Fut>(
    url: &str,
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(v) => {
                info!(url, attempt, "pulled data");
                return Ok(v);
            }
            Err(ApiError::Timeout { .. }) if attempt < policy.attempts => {
                warn!(url, attempt, "request timed out; retrying");
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(ApiError::Timeout { .. }) => {
                return Err(ApiError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                });
            }
            Err(err) => return Err(err),
        }
    }
}

/// reqwest-backed client; one instance lives for the whole run.
pub struct HttpApi {
    http: Client,
    policy: RetryPolicy,
}

impl HttpApi {
    pub fn new(cfg: &HttpSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .user_agent(concat!("nhl_data_pull/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            policy: RetryPolicy::from(cfg),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Value, ApiError> {
        let resp = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| classify(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.json::<Value>().await.map_err(|e| classify(url, e))
    }
}

fn classify(url: &str, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout {
            url: url.to_string(),
        }
    } else {
        ApiError::Request {
            url: url.to_string(),
            source: err,
        }
    }
}

#[async_trait]
impl NhlApi for HttpApi {
    #[instrument(skip(self))]
    async fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        debug!("requesting data");
        retry_on_timeout(url, self.policy, || self.fetch_once(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    const URL: &str = "https://statsapi.web.nhl.com/api/v1/teams";

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            delay: Duration::ZERO,
        }
    }

    fn timeout() -> ApiError {
        ApiError::Timeout { url: URL.into() }
    }

    #[tokio::test]
    async fn two_timeouts_then_success_returns_payload() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let calls = Cell::new(0u32);
        let out = retry_on_timeout(URL, policy(), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(timeout())
                } else {
                    Ok(serde_json::json!({"teams": []}))
                }
            }
        })
        .await
        .expect("third attempt succeeds");

        assert_eq!(calls.get(), 3);
        assert_eq!(out, serde_json::json!({"teams": []}));
        let text = logs.text();
        assert_eq!(text.matches("request timed out; retrying").count(), 2);
        assert!(text.contains("WARN"));
    }

    #[tokio::test]
    async fn exhausted_retries_are_reported() {
        let calls = Cell::new(0u32);
        let err = retry_on_timeout(URL, policy(), || {
            calls.set(calls.get() + 1);
            async { Err::<Value, _>(timeout()) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.get(), 3);
        assert!(matches!(err, ApiError::RetriesExhausted { attempts: 3, .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn status_errors_are_not_retried() {
        let calls = Cell::new(0u32);
        let err = retry_on_timeout(URL, policy(), || {
            calls.set(calls.get() + 1);
            async {
                Err::<Value, _>(ApiError::Status {
                    url: URL.into(),
                    status: 503,
                })
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.get(), 1);
        assert!(matches!(err, ApiError::Status { status: 503, .. }));
    }

    #[test]
    fn policy_never_drops_below_one_attempt() {
        let cfg = HttpSettings {
            attempts: 0,
            ..HttpSettings::default()
        };
        assert_eq!(RetryPolicy::from(&cfg).attempts, 1);
    }
}
