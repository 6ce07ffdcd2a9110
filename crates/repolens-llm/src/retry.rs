use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

const BASE_BACKOFF_SECS: u64 = 1;

/// Parse the `Retry-After` header value as seconds, falling back to exponential backoff.
pub(crate) fn retry_delay(response: &reqwest::Response, attempt: u32) -> Duration {
    if let Some(val) = response.headers().get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.parse::<u64>()
    {
        return Duration::from_secs(secs);
    }
    backoff(attempt)
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(BASE_BACKOFF_SECS << attempt.min(16))
}

/// Send an HTTP request, retrying up to `max_retries` times on 429 responses.
///
/// # Errors
///
/// Returns `LlmError::RateLimited` if all attempts are exhausted, or the underlying
/// `reqwest::Error` wrapped as `LlmError::Http` for other failures.
pub(crate) async fn send_with_retry<F, Fut>(
    provider_name: &str,
    max_retries: u32,
    mut f: F,
) -> Result<reqwest::Response, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..=max_retries {
        let response = f().await.map_err(LlmError::Http)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if attempt == max_retries {
                return Err(LlmError::RateLimited);
            }
            let delay = retry_delay(&response, attempt);
            tracing::warn!(
                provider = provider_name,
                attempt = attempt + 1,
                max_retries,
                "rate limited, retrying in {}s",
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        return Ok(response);
    }

    Err(LlmError::RateLimited)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn rate_limited() -> ResponseTemplate {
        ResponseTemplate::new(429).insert_header("retry-after", "0")
    }

    async fn call(server: &MockServer, max_retries: u32) -> Result<reqwest::Response, LlmError> {
        let client = reqwest::Client::new();
        let url = format!("{}/test", server.uri());
        send_with_retry("test", max_retries, || client.get(&url).send()).await
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let result = call(&server, 3).await;
        assert_eq!(result.unwrap().status(), 200);
    }

    #[tokio::test]
    async fn exhausted_retries_return_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(rate_limited())
            .expect(2)
            .mount(&server)
            .await;

        let result = call(&server, 1).await;
        assert!(
            matches!(result, Err(LlmError::RateLimited)),
            "expected RateLimited, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn succeeds_after_one_429() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(rate_limited())
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = call(&server, 2).await;
        assert_eq!(result.unwrap().status(), 200);
    }

    #[tokio::test]
    async fn non_429_errors_are_returned_as_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let result = call(&server, 3).await;
        assert_eq!(result.unwrap().status(), 500);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn backoff_doubles_until_cap(attempt in 1u32..16) {
            let delay = backoff(attempt);
            let prev = backoff(attempt - 1);
            prop_assert_eq!(delay.as_secs(), prev.as_secs() * 2);
        }

        #[test]
        fn backoff_never_overflows(attempt in any::<u32>()) {
            prop_assert!(backoff(attempt).as_secs() >= BASE_BACKOFF_SECS);
        }
    }
}
