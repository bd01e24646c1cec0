use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::{blocking::{Client, Response}, redirect::Policy};

/// Build the blocking HTTP client shared by all remote sources.
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("tractflow/", env!("CARGO_PKG_VERSION")))
        .redirect(Policy::limited(10))
        .timeout(timeout)
        .build()
        .context("build HTTP client")
}

/// Open a streaming GET; the body is consumed through `std::io::Read`.
pub(crate) fn open_remote(client: &Client, url: &str) -> Result<Response> {
    client.get(url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url} returned error status"))
}

/// Download a whole remote file into memory.
pub(crate) fn fetch_bytes(client: &Client, url: &str) -> Result<Bytes> {
    open_remote(client, url)?
        .bytes()
        .with_context(|| format!("read body of {url}"))
}

