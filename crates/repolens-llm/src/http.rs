//! HTTP client shared by the OpenAI-compatible backend.

use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// `reqwest` client with rustls, bounded redirects, and a `repolens/{version}`
/// user agent.
///
/// The request timeout is an upper bound for a single HTTP exchange; answer
/// generation applies its own, usually shorter, deadline on top.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("repolens/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}
