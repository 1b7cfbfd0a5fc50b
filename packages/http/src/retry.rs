//! HTTP retry helpers for transient errors.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use reqwest::StatusCode;

use crate::HttpError;

/// Retries after the first attempt.
pub const MAX_RETRIES: u32 = 3;

/// Backoff before the first retry; doubles on each subsequent retry.
const BACKOFF_BASE: Duration = Duration::from_millis(300);

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// What to do with a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusAction {
    Accept,
    Retry,
    Fail,
}

/// 429 and the gateway/server errors are retried; any other 4xx/5xx is
/// permanent.
fn status_action(status: StatusCode) -> StatusAction {
    match status.as_u16() {
        429 | 500 | 502 | 503 | 504 => StatusAction::Retry,
        s if s >= 400 => StatusAction::Fail,
        _ => StatusAction::Accept,
    }
}

/// Delay before retry number `attempt` (1-based): 300ms, 600ms, 1.2s.
fn backoff(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

/// Sends a request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`. Connection errors, timeouts, HTTP 429, and HTTP
/// 500/502/503/504 are retried up to [`MAX_RETRIES`] times with
/// exponential backoff. Other 4xx/5xx statuses fail immediately.
///
/// # Errors
///
/// Returns [`HttpError`] if the request fails after all retries, the
/// server returns a non-retryable status, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, HttpError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, MAX_RETRIES).await?;
    let url = response.url().to_string();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::warn!("JSON parse failed for {url}: {e}\n  body preview: {preview}");
        HttpError::Json {
            url,
            message: e.to_string(),
        }
    })
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, HttpError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(HttpError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                match status_action(status) {
                    StatusAction::Accept => return Ok(response),
                    StatusAction::Retry if attempt < max_retries => {
                        log::warn!("  HTTP {status} from {}", response.url());
                        attempt += 1;
                    }
                    StatusAction::Retry | StatusAction::Fail => {
                        return Err(HttpError::Status {
                            status: status.as_u16(),
                            url: response.url().to_string(),
                        });
                    }
                }
            }
        }
    }
}
