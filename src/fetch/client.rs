use async_trait::async_trait;
use reqwest::{Request, Response};

/// Abstraction over an HTTP client so adapters can be driven by fakes in
/// tests and composed with auth wrappers in production.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
