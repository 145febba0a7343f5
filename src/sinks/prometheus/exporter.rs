use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{GaugeVec, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{metric_name, sanitize};
use crate::config::PrometheusConfig;
use crate::errors::SinkError;
use crate::points::MetricPoint;

type LabelValues = Vec<String>;

/// Gauge registry with frozen label sets and zero-fill reconciliation
///
/// Cheap to clone; clones share the registry. A disabled exporter accepts
/// every call and does nothing.
#[derive(Clone)]
pub struct PrometheusExporter {
    inner: Option<Arc<GaugeRegistry>>,
    local_addr: Option<SocketAddr>,
}

struct GaugeRegistry {
    registry: Registry,
    prefix: String,
    slots: Mutex<HashMap<String, Arc<Mutex<GaugeSlot>>>>,
}

/// Everything known about one metric name
#[derive(Default)]
struct GaugeSlot {
    gauge: Option<GaugeVec>,
    label_names: Vec<String>,
    memory: HashSet<LabelValues>,
    logged_registration: bool,
    logged_label_mismatch: bool,
    logged_non_numeric: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

impl PrometheusExporter {
    /// Bind the `/metrics` listener and serve until `shutdown` fires
    ///
    /// A configuration with `enabled = false`, or a listener that cannot
    /// bind, yields a disabled exporter.
    pub async fn start(config: &PrometheusConfig, shutdown: CancellationToken) -> Self {
        if !config.enabled {
            info!("Prometheus exporter disabled by configuration");
            return Self::disabled();
        }

        let addr = format!("{}:{}", config.address, config.port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(
                    "Failed to start Prometheus metrics endpoint on {}: {}",
                    addr, e
                );
                return Self::disabled();
            }
        };

        let mut exporter = Self::detached(&config.prefix);
        exporter.local_addr = listener.local_addr().ok();

        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(exporter.clone());
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
            if let Err(e) = served {
                error!("Prometheus metrics endpoint stopped: {}", e);
            }
        });

        info!("Prometheus metrics endpoint enabled on {}/metrics", addr);
        exporter
    }

    /// An enabled registry with no HTTP listener
    pub fn detached(prefix: &str) -> Self {
        Self {
            inner: Some(Arc::new(GaugeRegistry {
                registry: Registry::new(),
                prefix: sanitize(prefix),
                slots: Mutex::new(HashMap::new()),
            })),
            local_addr: None,
        }
    }

    pub fn disabled() -> Self {
        Self {
            inner: None,
            local_addr: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Address the listener actually bound to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Record a batch of points
    pub fn observe(&self, points: &[MetricPoint]) {
        if let Some(inner) = &self.inner {
            inner.observe(points);
        }
    }

    /// Current value of a series, if the metric has ever seen that label tuple
    pub fn gauge_value(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        let slot = self.inner.as_ref()?.existing_slot(name)?;
        let slot = lock(&slot);
        let key: LabelValues = label_values.iter().map(|v| v.to_string()).collect();
        if !slot.memory.contains(&key) {
            return None;
        }
        let gauge = slot.gauge.as_ref()?;
        gauge
            .get_metric_with_label_values(label_values)
            .ok()
            .map(|g| g.get())
    }

    /// Frozen label names of a registered metric
    pub fn label_names(&self, name: &str) -> Option<Vec<String>> {
        let slot = self.inner.as_ref()?.existing_slot(name)?;
        let slot = lock(&slot);
        slot.gauge.as_ref().map(|_| slot.label_names.clone())
    }

    /// Text exposition of every registered gauge
    pub fn render(&self) -> Result<String, SinkError> {
        let Some(inner) = &self.inner else {
            return Ok(String::new());
        };
        TextEncoder::new()
            .encode_to_string(&inner.registry.gather())
            .map_err(|e| SinkError::write("prometheus", e.to_string()))
    }
}

async fn metrics_handler(State(exporter): State<PrometheusExporter>) -> Response {
    match exporter.render() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )
            .into_response(),
        Err(e) => {
            error!("{e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

impl GaugeRegistry {
    fn existing_slot(&self, name: &str) -> Option<Arc<Mutex<GaugeSlot>>> {
        lock(&self.slots).get(name).cloned()
    }

    fn slot(&self, name: &str) -> Arc<Mutex<GaugeSlot>> {
        lock(&self.slots)
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    fn observe(&self, points: &[MetricPoint]) {
        let mut seen: HashMap<String, (Arc<Mutex<GaugeSlot>>, HashSet<LabelValues>)> =
            HashMap::new();

        for point in points {
            if point.measurement().is_empty() || point.fields().is_empty() {
                continue;
            }

            for (field, value) in point.fields() {
                let name = metric_name(&self.prefix, point.measurement(), field);
                let slot = self.slot(&name);
                let mut guard = lock(&slot);

                if !self.ensure_registered(&name, &mut guard, point) {
                    continue;
                }
                if !guard.logged_label_mismatch {
                    let extras: Vec<&str> = point
                        .tags()
                        .keys()
                        .filter(|k| !guard.label_names.contains(*k))
                        .map(String::as_str)
                        .collect();
                    if !extras.is_empty() {
                        warn!(
                            "Prometheus metric {} received unexpected labels {}; ignoring extras",
                            name,
                            extras.join(",")
                        );
                        guard.logged_label_mismatch = true;
                    }
                }

                let values: LabelValues = guard
                    .label_names
                    .iter()
                    .map(|label| point.tag_value(label).unwrap_or_default().to_string())
                    .collect();
                guard.memory.insert(values.clone());
                seen.entry(name.clone())
                    .or_insert_with(|| (slot.clone(), HashSet::new()))
                    .1
                    .insert(values.clone());

                let numeric = match value.as_f64() {
                    Some(v) => v,
                    None if value.is_absent() => continue,
                    None => {
                        if !guard.logged_non_numeric {
                            info!(
                                "Prometheus metric {} received non-numeric value; exporting as 1",
                                name
                            );
                            guard.logged_non_numeric = true;
                        }
                        1.0
                    }
                };

                if let Some(gauge) = &guard.gauge {
                    match gauge.get_metric_with_label_values(&as_strs(&values)) {
                        Ok(series) => series.set(numeric),
                        Err(e) => error!("Failed to set Prometheus metric {}: {}", name, e),
                    }
                }
            }
        }

        for (name, (slot, seen_values)) in seen {
            let guard = lock(&slot);
            let Some(gauge) = &guard.gauge else {
                continue;
            };
            for values in guard.memory.difference(&seen_values) {
                match gauge.get_metric_with_label_values(&as_strs(values)) {
                    Ok(series) => series.set(0.0),
                    Err(e) => error!("Failed to reset Prometheus metric {}: {}", name, e),
                }
            }
        }
    }

    /// Register the gauge on first sight, freezing its label names.
    ///
    /// A failed registration leaves the slot unfrozen so a later call can
    /// try again; the failure is logged once per name.
    fn ensure_registered(&self, name: &str, slot: &mut GaugeSlot, point: &MetricPoint) -> bool {
        if slot.gauge.is_some() {
            return true;
        }

        let label_names: Vec<String> = point.tags().keys().cloned().collect();
        match self.register(name, &label_names) {
            Ok(gauge) => {
                slot.gauge = Some(gauge);
                slot.label_names = label_names;
                true
            }
            Err(e) => {
                if !slot.logged_registration {
                    error!("{e}");
                    slot.logged_registration = true;
                }
                false
            }
        }
    }

    fn register(&self, name: &str, label_names: &[String]) -> Result<GaugeVec, SinkError> {
        let registration_error = |e: prometheus::Error| SinkError::Registration {
            metric: name.to_string(),
            message: e.to_string(),
        };
        let opts = Opts::new(name, format!("Varken metric {name}"));
        let gauge = GaugeVec::new(opts, &as_strs(label_names)).map_err(registration_error)?;
        self.registry
            .register(Box::new(gauge.clone()))
            .map_err(registration_error)?;
        Ok(gauge)
    }
}
