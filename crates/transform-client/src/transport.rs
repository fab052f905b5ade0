use crate::error::Result;
use reqwest::{Request, StatusCode};
use std::future::Future;

/// Status and body text of a server response, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Sends a fully built request and returns whatever the server answered.
///
/// Implementations must not retry and must not treat non-2xx statuses as
/// errors; status handling belongs to the client.
pub trait Transport: Send + Sync {
    fn execute(&self, request: Request) -> impl Future<Output = Result<RawResponse>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<RawResponse> {
        let resp = self.http.execute(request).await?;
        let status = resp.status();
        let body = resp.text().await?;
        Ok(RawResponse { status, body })
    }
}
