use tracing::trace;

use crate::points::MetricPoint;
use crate::sinks::prometheus::PrometheusExporter;

/// Sink used when no push backend is configured
///
/// Forwards to the pull exporter when there is one, so collectors can write
/// unconditionally.
#[derive(Clone, Default)]
pub struct NoopSink {
    exporter: Option<PrometheusExporter>,
}

impl NoopSink {
    pub fn new(exporter: Option<PrometheusExporter>) -> Self {
        Self { exporter }
    }

    pub fn exporter(&self) -> Option<&PrometheusExporter> {
        self.exporter.as_ref()
    }

    pub fn write(&self, points: &[MetricPoint]) {
        match &self.exporter {
            Some(exporter) => exporter.observe(points),
            None => trace!("Discarding {} points; no metrics backend configured", points.len()),
        }
    }
}
