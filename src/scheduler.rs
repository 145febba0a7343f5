//! Interval scheduling of collectors
//!
//! Every (server, metric) pair gets its own task and its own interval, so a
//! slow or failing service never holds up another. The first cycle runs as
//! soon as the task starts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::{Config, ServerConnection};
use crate::errors::AppResult;
use crate::services::{
    Collector, OverseerrApi, OverseerrMetric, RadarrApi, RadarrMetric, ServiceCollector,
    SonarrApi, SonarrMetric, TautulliApi, TautulliMetric,
};
use crate::sinks::SinkSet;
use crate::utils::http_client::{ApiClient, ApiKeyPlacement, HttpApiClient};

/// A collector and how often to run it
pub struct ScheduledJob {
    pub name: String,
    pub every: Duration,
    pub collector: Arc<dyn Collector>,
}

pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    sinks: Arc<SinkSet>,
}

impl Scheduler {
    pub fn new(sinks: Arc<SinkSet>) -> Self {
        Self {
            jobs: Vec::new(),
            sinks,
        }
    }

    /// Build one job per enabled poller in `config`
    pub fn from_config(config: &Config, sinks: Arc<SinkSet>) -> AppResult<Self> {
        let mut scheduler = Self::new(sinks);
        let timeout = config.global.request_timeout();
        let seconds = Duration::from_secs;

        for server in &config.sonarr {
            let client = http_client(
                "sonarr",
                &server.connection,
                ApiKeyPlacement::Header("X-Api-Key"),
                timeout,
            )?;
            let api = Arc::new(SonarrApi::new(
                server.connection.id,
                client,
                server.missing_days,
                server.future_days,
            ));
            if server.missing_days > 0 {
                scheduler.add(
                    Arc::new(ServiceCollector::new(api.clone(), SonarrMetric::Missing)),
                    seconds(server.missing_days_run_seconds),
                );
            }
            if server.future_days > 0 {
                scheduler.add(
                    Arc::new(ServiceCollector::new(api.clone(), SonarrMetric::Future)),
                    seconds(server.future_days_run_seconds),
                );
            }
            if server.queue {
                scheduler.add(
                    Arc::new(ServiceCollector::new(api, SonarrMetric::Queue)),
                    seconds(server.queue_run_seconds),
                );
            }
        }

        for server in &config.radarr {
            let client = http_client(
                "radarr",
                &server.connection,
                ApiKeyPlacement::Header("X-Api-Key"),
                timeout,
            )?;
            let api = Arc::new(RadarrApi::new(server.connection.id, client));
            if server.get_missing {
                scheduler.add(
                    Arc::new(ServiceCollector::new(api.clone(), RadarrMetric::Missing)),
                    seconds(server.get_missing_run_seconds),
                );
            }
            if server.queue {
                scheduler.add(
                    Arc::new(ServiceCollector::new(api, RadarrMetric::Queue)),
                    seconds(server.queue_run_seconds),
                );
            }
        }

        for server in &config.overseerr {
            let client = http_client(
                "overseerr",
                &server.connection,
                ApiKeyPlacement::Header("X-Api-Key"),
                timeout,
            )?;
            let api = Arc::new(OverseerrApi::new(
                server.connection.id,
                client,
                server.num_latest_requests_to_fetch,
            ));
            if server.get_request_total_counts {
                scheduler.add(
                    Arc::new(ServiceCollector::new(api.clone(), OverseerrMetric::RequestCounts)),
                    seconds(server.request_total_run_seconds),
                );
            }
            if server.num_latest_requests_to_fetch > 0 {
                scheduler.add(
                    Arc::new(ServiceCollector::new(api, OverseerrMetric::LatestRequests)),
                    seconds(server.num_latest_requests_seconds),
                );
            }
        }

        for server in &config.tautulli {
            let client = http_client(
                "tautulli",
                &server.connection,
                ApiKeyPlacement::Query("apikey"),
                timeout,
            )?;
            let api = Arc::new(TautulliApi::new(server.connection.id, client));
            if server.get_activity {
                scheduler.add(
                    Arc::new(ServiceCollector::new(api.clone(), TautulliMetric::Activity)),
                    seconds(server.get_activity_run_seconds),
                );
            }
            if server.get_stats {
                scheduler.add(
                    Arc::new(ServiceCollector::new(api, TautulliMetric::LibraryStats)),
                    seconds(server.get_stats_run_seconds),
                );
            }
        }

        Ok(scheduler)
    }

    pub fn add(&mut self, collector: Arc<dyn Collector>, every: Duration) {
        self.jobs.push(ScheduledJob {
            name: collector.name(),
            every,
            collector,
        });
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Spawn one task per job; each stops when `shutdown` is cancelled
    pub fn spawn(self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        info!("Scheduling {} collectors", self.jobs.len());
        self.jobs
            .into_iter()
            .map(|job| {
                let sinks = self.sinks.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(run_job(job, sinks, shutdown))
            })
            .collect()
    }
}

async fn run_job(job: ScheduledJob, sinks: Arc<SinkSet>, shutdown: CancellationToken) {
    info!(job = %job.name, "Running every {}s", job.every.as_secs());
    let mut ticker = interval(job.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cycle(&job.name, job.collector.as_ref(), &sinks).await;
            }
            _ = shutdown.cancelled() => {
                debug!(job = %job.name, "Stopping");
                break;
            }
        }
    }
}

/// Run one collection cycle and hand the result to the sinks.
///
/// Returns whether the cycle produced a batch.
pub async fn run_cycle(name: &str, collector: &dyn Collector, sinks: &SinkSet) -> bool {
    match collector.collect().await {
        Ok(points) => {
            debug!(job = %name, "Collected {} points", points.len());
            sinks.write(&points).await;
            true
        }
        Err(e) => {
            error!(job = %name, "Collection failed: {}", e);
            false
        }
    }
}

fn http_client(
    service: &str,
    connection: &ServerConnection,
    placement: ApiKeyPlacement,
    timeout: Duration,
) -> AppResult<Arc<dyn ApiClient>> {
    let client = HttpApiClient::new(
        format!("{service}-{}", connection.id),
        &connection.url,
        connection.api_key.clone(),
        placement,
        connection.verify_ssl,
        timeout,
    )?;
    Ok(Arc::new(client))
}
