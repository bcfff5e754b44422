use crate::domain::bench::{CaseKind, Sample, Timespan};
use crate::domain::model::RouteStyle;
use crate::domain::ports::LoadTarget;
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Both endpoints report their own processing window.
#[derive(Debug, Deserialize)]
struct ServerSpan {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Drives one endpoint of a running service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLoadTarget {
    client: Client,
    base_url: String,
    case: CaseKind,
    route_style: RouteStyle,
}

impl HttpLoadTarget {
    pub fn new(
        base_url: &str,
        case: CaseKind,
        route_style: RouteStyle,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            case,
            route_style,
        })
    }

    pub fn url_for(&self, load: u64) -> Result<String> {
        let n = self.case.request_n(load)?;
        let path = match self.case {
            CaseKind::Fibonacci => self.route_style.request_path(n),
            CaseKind::BubbleSort => format!("/bubble-sort?n={}", n),
        };
        Ok(format!("{}{}", self.base_url, path))
    }
}

#[async_trait]
impl LoadTarget for HttpLoadTarget {
    fn name(&self) -> &str {
        self.case.name()
    }

    fn min_recommended_load(&self) -> u64 {
        self.case.min_recommended_load()
    }

    async fn run(&self, load: u64) -> Result<Sample> {
        let url = self.url_for(load)?;
        let start = Utc::now();

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BenchError::UpstreamStatusError {
                url,
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        let request_span = Timespan::until_now(start)?;

        let malformed = |message: String| BenchError::UpstreamBodyError {
            url: url.clone(),
            message,
        };
        let span: ServerSpan =
            serde_json::from_slice(&body).map_err(|e| malformed(e.to_string()))?;
        let server_processing_span =
            Timespan::new(span.start, span.end).map_err(|e| malformed(e.to_string()))?;

        Ok(Sample {
            test_case_name: self.case.name().to_string(),
            load,
            request_span,
            server_processing_span,
        })
    }
}
