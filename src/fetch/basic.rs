use super::client::HttpClient;
use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;

/// Descriptive User-Agent sent on every upstream request. Scraped sources in
/// particular expect a self-identifying client.
pub const USER_AGENT: &str = concat!(
    "transit-incidents/",
    env!("CARGO_PKG_VERSION"),
    " (+incident reconciliation engine)"
);

/// Plain reqwest-backed [`HttpClient`] with bounded timeouts. Every upstream
/// fetch goes through one of these; a timeout surfaces the same way a bad
/// status does.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// Client with the default 30 second total timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Client with an explicit total timeout, for large feeds (protobuf
    /// alert dumps, multi-page scrapes) that need a longer bound.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self(client)
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}

/// Fetches `url` through `client`, returning the body bytes.
///
/// Any transport error, timeout, or non-2xx status maps to
/// [`FetchError::Upstream`] tagged with `source_name`.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    source_name: &'static str,
    url: &str,
) -> Result<Vec<u8>, FetchError> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse()
            .map_err(|e| FetchError::upstream(source_name, format!("bad url: {e}")))?,
    );

    let resp = client
        .execute(req)
        .await
        .map_err(|e| FetchError::upstream(source_name, e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::upstream(
            source_name,
            format!("status {status}"),
        ));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| FetchError::upstream(source_name, e.to_string()))?;
    Ok(bytes.to_vec())
}
