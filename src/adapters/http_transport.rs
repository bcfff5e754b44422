use crate::domain::model::{FibonacciPayload, RouteStyle};
use crate::domain::ports::FibonacciTransport;
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Sends Fibonacci sub-calls over HTTP to the configured base URL.
/// One pooled client per worker, shared by every in-flight request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    route_style: RouteStyle,
}

impl HttpTransport {
    pub fn new(base_url: &str, route_style: RouteStyle, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            route_style,
        })
    }

    pub fn url_for(&self, n: u64) -> String {
        format!("{}{}", self.base_url, self.route_style.request_path(n))
    }
}

#[async_trait]
impl FibonacciTransport for HttpTransport {
    async fn fetch(&self, n: u64) -> Result<u64> {
        let url = self.url_for(n);
        tracing::debug!("Making sub-request to: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(BenchError::UpstreamStatusError {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let payload: FibonacciPayload =
            serde_json::from_slice(&body).map_err(|e| BenchError::UpstreamBodyError {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Ok(payload.fibonacci)
    }
}
