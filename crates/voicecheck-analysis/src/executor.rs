//! Bounded retry for a single logical HTTP request.
//!
//! Backoff is linear in the attempt number (`base_delay * attempt`) so the
//! worst-case latency of a foreground analysis stays predictable.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use voicecheck_types::RetryTuning;

use crate::extract::extract_text;
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::AttemptOutcome;

/// Default number of HTTP calls per logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Failure reasons are kept whole; log lines show at most this many characters.
const LOG_REASON_CHARS: usize = 200;

/// Issues requests through an [`HttpTransport`], retrying transient failures.
#[derive(Clone)]
pub struct RetryingExecutor {
    transport: Arc<dyn HttpTransport>,
    base_delay: Duration,
}

impl RetryingExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Build an executor from configured retry tuning.
    pub fn from_tuning(transport: Arc<dyn HttpTransport>, tuning: RetryTuning) -> Self {
        Self::new(transport).with_base_delay(Duration::from_millis(tuning.base_delay_ms))
    }

    /// POST a JSON body to `url`.
    pub async fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
        max_attempts: u32,
    ) -> AttemptOutcome {
        self.execute(&HttpRequest::json(url, body), max_attempts).await
    }

    /// Send `request`, retrying on 429/5xx up to `max_attempts` calls in total.
    ///
    /// Never returns [`AttemptOutcome::RetryableFailure`]; an exhausted budget
    /// becomes a terminal failure carrying the last response.
    pub async fn execute(&self, request: &HttpRequest, max_attempts: u32) -> AttemptOutcome {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome = match self.transport.send(request).await {
                Ok(resp) => classify_status(resp.status, resp.body),
                Err(e) => {
                    warn!(url = %request.url, attempt, "Request failed: {e}");
                    return AttemptOutcome::TerminalFailure(e.to_string());
                }
            };

            match outcome {
                AttemptOutcome::RetryableFailure(reason) if attempt < max_attempts => {
                    let delay = backoff_delay(self.base_delay, attempt);
                    warn!(
                        url = %request.url,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, retrying: {}",
                        truncate(&reason, LOG_REASON_CHARS)
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                AttemptOutcome::RetryableFailure(reason) => {
                    warn!(url = %request.url, attempts = attempt, "Retry budget exhausted");
                    return AttemptOutcome::TerminalFailure(format!(
                        "{reason} (after {attempt} attempts)"
                    ));
                }
                AttemptOutcome::TerminalFailure(reason) => {
                    warn!(
                        url = %request.url,
                        attempt,
                        "Terminal failure: {}",
                        truncate(&reason, LOG_REASON_CHARS)
                    );
                    return AttemptOutcome::TerminalFailure(reason);
                }
                success => {
                    debug!(url = %request.url, attempt, "Request succeeded");
                    return success;
                }
            }
        }
    }
}

/// Linear backoff before retry number `attempt`, saturating instead of overflowing.
fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    base_delay.saturating_mul(attempt)
}

/// Map one HTTP status to an outcome; failure reasons carry the extracted body.
pub fn classify_status(status: u16, body: String) -> AttemptOutcome {
    match status {
        200..=299 => AttemptOutcome::Success(body),
        429 | 500..=599 => AttemptOutcome::RetryableFailure(describe(status, &body)),
        _ => AttemptOutcome::TerminalFailure(describe(status, &body)),
    }
}

fn describe(status: u16, body: &str) -> String {
    let detail = extract_text(body);
    let detail = detail.trim();
    if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {detail}")
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Reply};
    use serde_json::json;

    const URL: &str = "http://backend.test/gen";

    fn executor(mock: Arc<MockTransport>) -> RetryingExecutor {
        RetryingExecutor::new(mock)
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(204, String::new()),
            AttemptOutcome::Success(String::new())
        );
        assert!(matches!(
            classify_status(429, String::new()),
            AttemptOutcome::RetryableFailure(_)
        ));
        assert!(matches!(
            classify_status(503, String::new()),
            AttemptOutcome::RetryableFailure(_)
        ));
        assert!(matches!(
            classify_status(404, String::new()),
            AttemptOutcome::TerminalFailure(_)
        ));
        assert!(matches!(
            classify_status(301, String::new()),
            AttemptOutcome::TerminalFailure(_)
        ));
    }

    #[test]
    fn test_failure_reason_uses_extracted_body() {
        let outcome = classify_status(400, r#"{"error":"bad audio"}"#.into());
        assert_eq!(
            outcome,
            AttemptOutcome::TerminalFailure("HTTP 400: bad audio".into())
        );
    }

    #[test]
    fn test_long_reason_kept_whole() {
        let long = "x".repeat(500);
        let outcome = classify_status(500, long.clone());
        assert_eq!(outcome, AttemptOutcome::RetryableFailure(format!("HTTP 500: {long}")));
        assert_eq!(truncate(&long, 200).chars().count(), 201);
    }

    #[test]
    fn test_backoff_delay_saturates() {
        assert_eq!(backoff_delay(Duration::from_millis(500), 3), Duration::from_millis(1500));
        assert_eq!(backoff_delay(Duration::MAX, 2), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_500_makes_exactly_max_attempts() {
        let mock = Arc::new(MockTransport::new().script(URL, vec![Reply::status(500, "boom")]));
        let outcome = executor(mock.clone())
            .post_json(URL, json!({}), DEFAULT_MAX_ATTEMPTS)
            .await;

        assert_eq!(mock.call_count(), 3);
        match outcome {
            AttemptOutcome::TerminalFailure(reason) => {
                assert!(reason.contains("HTTP 500: boom"));
                assert!(reason.contains("after 3 attempts"));
            }
            other => panic!("expected terminal failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_call_is_single_attempt() {
        let mock = Arc::new(MockTransport::new().script(URL, vec![Reply::ok("{\"output\":\"ok\"}")]));
        let outcome = executor(mock.clone()).post_json(URL, json!({}), 3).await;

        assert_eq!(mock.call_count(), 1);
        assert_eq!(outcome, AttemptOutcome::Success("{\"output\":\"ok\"}".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let mock = Arc::new(MockTransport::new().script(
            URL,
            vec![
                Reply::status(429, "slow down"),
                Reply::status(503, ""),
                Reply::ok("done"),
            ],
        ));
        let outcome = executor(mock.clone()).post_json(URL, json!({}), 3).await;

        assert_eq!(mock.call_count(), 3);
        assert_eq!(outcome, AttemptOutcome::Success("done".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_linear() {
        let mock = Arc::new(MockTransport::new().script(URL, vec![Reply::status(502, "")]));
        let exec = executor(mock.clone()).with_base_delay(Duration::from_millis(100));

        let start = tokio::time::Instant::now();
        exec.post_json(URL, json!({}), 4).await;
        // 100 + 200 + 300
        assert_eq!(start.elapsed(), Duration::from_millis(600));
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_not_retried() {
        let mock = Arc::new(MockTransport::new().script(URL, vec![Reply::status(401, "denied")]));
        let outcome = executor(mock.clone()).post_json(URL, json!({}), 3).await;

        assert_eq!(mock.call_count(), 1);
        assert!(matches!(outcome, AttemptOutcome::TerminalFailure(r) if r.contains("401")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_not_retried() {
        let mock = Arc::new(MockTransport::new().script(URL, vec![Reply::refused()]));
        let outcome = executor(mock.clone()).post_json(URL, json!({}), 3).await;

        assert_eq!(mock.call_count(), 1);
        assert!(matches!(outcome, AttemptOutcome::TerminalFailure(r) if r.contains("refused")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_calls_once() {
        let mock = Arc::new(MockTransport::new().script(URL, vec![Reply::status(500, "")]));
        executor(mock.clone()).post_json(URL, json!({}), 0).await;
        assert_eq!(mock.call_count(), 1);
    }
}
