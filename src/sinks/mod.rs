//! Metrics sinks
//!
//! A [`SinkSet`] fans every batch out to each configured [`Sink`]. Writes
//! never fail from the caller's point of view; each sink logs and drops its
//! own errors so one broken backend cannot starve another.

pub mod influx;
pub mod line_protocol;
pub mod noop;
pub mod prometheus;

use strum::IntoStaticStr;

use crate::points::MetricPoint;

pub use influx::InfluxSink;
pub use noop::NoopSink;
pub use prometheus::PrometheusExporter;

#[derive(IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Sink {
    /// Batches written to a time-series store
    Push(InfluxSink),
    /// Gauges kept in-process for scraping
    Pull(PrometheusExporter),
    /// No push store; forwards to an optional pull exporter
    Disabled(NoopSink),
}

impl Sink {
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    pub async fn write(&self, points: &[MetricPoint]) {
        match self {
            Self::Push(influx) => influx.write(points).await,
            Self::Pull(exporter) => exporter.observe(points),
            Self::Disabled(noop) => noop.write(points),
        }
    }
}

/// Every configured sink
pub struct SinkSet {
    sinks: Vec<Sink>,
}

impl SinkSet {
    /// Assemble the set from whatever backends came up
    ///
    /// Without a push store the set holds a single [`Sink::Disabled`]
    /// wrapping the pull exporter, if any.
    pub fn new(push: Option<InfluxSink>, pull: Option<PrometheusExporter>) -> Self {
        let sinks = match push {
            Some(influx) => std::iter::once(Sink::Push(influx))
                .chain(pull.map(Sink::Pull))
                .collect(),
            None => vec![Sink::Disabled(NoopSink::new(pull))],
        };
        Self { sinks }
    }

    pub fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    pub async fn write(&self, points: &[MetricPoint]) {
        for sink in &self.sinks {
            sink.write(points).await;
        }
    }
}
