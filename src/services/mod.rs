//! Per-service normalizers
//!
//! Each polled API is a [`Service`] with a small set of metric kinds. A
//! [`ServiceCollector`] binds one service to one metric kind so the
//! scheduler can run every (server, metric) pair on its own interval.
//!
//! A cycle either yields its complete batch of points or an error; a failed
//! request anywhere in the cycle means nothing is emitted for it.

pub mod overseerr;
pub mod pagination;
pub mod radarr;
pub mod sonarr;
pub mod tautulli;

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{AppResult, SourceError, SourceResult};
use crate::points::MetricPoint;

pub use overseerr::{OverseerrApi, OverseerrMetric};
pub use radarr::{RadarrApi, RadarrMetric};
pub use sonarr::{SonarrApi, SonarrMetric};
pub use tautulli::{TautulliApi, TautulliMetric};

/// One configured server of a polled API
#[async_trait]
pub trait Service: Send + Sync + 'static {
    type Metric: Copy + Display + Send + Sync + 'static;

    /// Short identifier such as `sonarr-1`
    fn label(&self) -> String;

    /// Run one collection cycle for `metric`
    async fn collect(&self, metric: Self::Metric) -> AppResult<Vec<MetricPoint>>;
}

/// Something the scheduler can run on an interval
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> String;

    async fn collect(&self) -> AppResult<Vec<MetricPoint>>;
}

/// A service bound to one of its metric kinds
pub struct ServiceCollector<S: Service> {
    service: Arc<S>,
    metric: S::Metric,
}

impl<S: Service> ServiceCollector<S> {
    pub fn new(service: Arc<S>, metric: S::Metric) -> Self {
        Self { service, metric }
    }
}

#[async_trait]
impl<S: Service> Collector for ServiceCollector<S> {
    fn name(&self) -> String {
        format!("{}/{}", self.service.label(), self.metric)
    }

    async fn collect(&self) -> AppResult<Vec<MetricPoint>> {
        self.service.collect(self.metric).await
    }
}

/// Unwrap a response body that must be a JSON array
pub(crate) fn expect_array(service: &str, body: Value) -> SourceResult<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        other => Err(SourceError::payload(
            service,
            format!("expected a JSON array, got {}", json_kind(&other)),
        )),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `1` for Usenet downloads, `0` for everything else
pub(crate) fn protocol_id(protocol: &str) -> i64 {
    i64::from(protocol.eq_ignore_ascii_case("usenet"))
}

pub(crate) fn params<const N: usize>(pairs: [(&str, String); N]) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
