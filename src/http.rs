//! Shared HTTP client construction with transient-failure retries

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;

use crate::Result;

pub const USER_AGENT: &str = concat!("rahukaal/", env!("CARGO_PKG_VERSION"));

/// Build a client that retries transient failures with exponential backoff
pub fn build_client(
    user_agent: &str,
    timeout: Duration,
    max_retries: u32,
) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}
