//! Shared `reqwest` client construction.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

const USER_AGENT: &str = concat!("gradbot/", env!("CARGO_PKG_VERSION"));

/// One client per process; every component clones the handle.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .gzip(true)
        .build()
        .context("building HTTP client")
}

/// Client for talking to local test servers, never routed through a proxy.
#[cfg(test)]
pub(crate) fn test_client() -> Client {
    Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
