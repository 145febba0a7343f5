//! Stand-in used when the crate is built without the `prometheus` feature

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::config::PrometheusConfig;
use crate::errors::SinkError;
use crate::points::MetricPoint;

/// Always-disabled exporter
#[derive(Clone, Default)]
pub struct PrometheusExporter;

impl PrometheusExporter {
    pub async fn start(config: &PrometheusConfig, _shutdown: CancellationToken) -> Self {
        if config.enabled {
            error!("varken was built without Prometheus support; the /metrics endpoint is disabled");
        }
        Self
    }

    pub fn detached(_prefix: &str) -> Self {
        Self
    }

    pub fn disabled() -> Self {
        Self
    }

    pub fn is_enabled(&self) -> bool {
        false
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    pub fn observe(&self, _points: &[MetricPoint]) {}

    pub fn gauge_value(&self, _name: &str, _label_values: &[&str]) -> Option<f64> {
        None
    }

    pub fn label_names(&self, _name: &str) -> Option<Vec<String>> {
        None
    }

    pub fn render(&self) -> Result<String, SinkError> {
        Ok(String::new())
    }
}
