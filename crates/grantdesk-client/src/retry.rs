//! Retry policy shared by the API clients.

use std::time::Duration;

use grantdesk_core::{AppError, HttpConfig};
use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::time::sleep;

/// Upper bound for a single backoff sleep.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Maximum attempts for rate-limited (429) responses.
/// With 500ms base and 30s cap: 1s, 2s, 4s, 8s, 16s, 30s... before giving up.
const RATE_LIMIT_MAX_RETRIES: u32 = 8;

/// Sends the request built by `build`, retrying transient failures.
///
/// - 429: honours `Retry-After` (seconds), otherwise exponential backoff
///   capped at 30s.
/// - 5xx, timeouts, connection errors: linear backoff up to
///   `config.max_retries` attempts.
/// - Other non-success statuses fail immediately.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed by
/// sending it.
pub(crate) async fn send_with_retry<F>(
    build: F,
    config: &HttpConfig,
    target: &str,
) -> Result<Response, AppError>
where
    F: Fn() -> RequestBuilder,
{
    let max_retries = config.max_retries.max(1);
    let base_delay = config.retry_base_delay;
    let effective_max = RATE_LIMIT_MAX_RETRIES.max(max_retries);
    let mut last_error = AppError::Generic("No attempts made".to_string());

    for attempt in 1..=effective_max {
        match build().send().await {
            Ok(resp) => {
                let status = resp.status();

                if status.is_success() {
                    return Ok(resp);
                }

                if status == StatusCode::TOO_MANY_REQUESTS {
                    last_error = AppError::RateLimitExceeded;
                    if attempt < effective_max {
                        let delay = retry_after(&resp).unwrap_or_else(|| {
                            (base_delay * 2_u32.saturating_pow(attempt)).min(MAX_RETRY_DELAY)
                        });
                        tracing::warn!(
                            target_api = target,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Rate limited, backing off"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    break;
                }

                if status.is_server_error() {
                    last_error =
                        AppError::ClientError(format!("Server error: HTTP {}", status.as_u16()));
                    if attempt < max_retries {
                        let delay = base_delay * attempt;
                        tracing::warn!(
                            target_api = target,
                            attempt,
                            status = status.as_u16(),
                            "Server error, retrying"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    break;
                }

                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(AppError::ClientError(format!(
                        "HTTP {} from {}: check the API key",
                        status.as_u16(),
                        target
                    )));
                }

                return Err(AppError::ClientError(format!(
                    "HTTP {} from {}",
                    status.as_u16(),
                    target
                )));
            }
            Err(e) => {
                if e.is_timeout() {
                    last_error = AppError::Timeout(config.timeout.as_secs());
                } else if e.is_connect() {
                    last_error = AppError::NetworkError(format!("Connection failed: {}", e));
                } else {
                    last_error = AppError::ClientError(e.to_string());
                }

                if attempt < max_retries && (e.is_timeout() || e.is_connect()) {
                    tracing::warn!(target_api = target, attempt, error = %e, "Request failed, retrying");
                    sleep(base_delay * attempt).await;
                    continue;
                }
                break;
            }
        }
    }

    tracing::error!(target_api = target, error = %last_error, "Giving up after retries");
    Err(last_error)
}

fn retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
