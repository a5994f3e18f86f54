//! Prometheus HTTP API metric source

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::Deserialize;
use stand_core::{FetchError, MetricSource};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Whole-call bound for one query
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Server-side evaluation bound, passed as the `timeout` parameter
pub const QUERY_TIMEOUT: &str = "5s";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
enum QueryData {
    Vector(Vec<VectorSample>),
    Scalar(SamplePair),
    Matrix(Vec<IgnoredAny>),
    String(SamplePair),
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    #[serde(default)]
    metric: HashMap<String, String>,
    value: SamplePair,
}

/// `[unix_seconds, "value"]`
#[derive(Debug, Deserialize)]
struct SamplePair(f64, String);

impl SamplePair {
    fn parse(&self) -> Result<f64, FetchError> {
        let SamplePair(at, raw) = self;
        debug!("sample {:?} at {}", raw, at);
        raw.parse::<f64>()
            .map_err(|_| FetchError::Malformed(format!("sample value {:?}", raw)))
    }
}

/// Reduce an instant-query response body to a single value.
///
/// A vector result must hold exactly one series.
pub fn parse_query_response(body: &str) -> Result<f64, FetchError> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    for warning in &response.warnings {
        warn!("prometheus warning: {}", warning);
    }

    if response.status != "success" {
        let kind = response.error_type.unwrap_or_else(|| "unknown".to_string());
        let message = response.error.unwrap_or_default();
        return Err(FetchError::Backend(format!("{}: {}", kind, message)));
    }

    match response.data {
        Some(QueryData::Vector(series)) => match series.as_slice() {
            [] => Err(FetchError::NoData),
            [only] => {
                debug!("series {:?}", only.metric);
                only.value.parse()
            }
            many => Err(FetchError::Ambiguous(many.len())),
        },
        Some(QueryData::Scalar(pair)) => pair.parse(),
        Some(QueryData::Matrix(series)) => {
            debug!("range result with {} series", series.len());
            Err(FetchError::UnsupportedResultType("matrix".to_string()))
        }
        Some(QueryData::String(SamplePair(_, text))) => {
            debug!("string result {:?}", text);
            Err(FetchError::UnsupportedResultType("string".to_string()))
        }
        None => Err(FetchError::Malformed("missing data".to_string())),
    }
}

/// Instant queries against one Prometheus endpoint
pub struct PrometheusSource {
    endpoint: String,
    client: reqwest::Client,
}

impl PrometheusSource {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn query_url(&self) -> String {
        format!("{}/api/v1/query", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl MetricSource for PrometheusSource {
    async fn fetch(&self, query: &str) -> Result<f64, FetchError> {
        let response = self
            .client
            .get(self.query_url())
            .query(&[("query", query), ("timeout", QUERY_TIMEOUT)])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        match parse_query_response(&body) {
            Err(FetchError::Malformed(_)) if !status.is_success() => {
                Err(FetchError::Backend(format!("HTTP {}", status)))
            }
            other => other,
        }
    }
}
