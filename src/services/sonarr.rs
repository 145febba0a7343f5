//! Sonarr: missing and upcoming episodes, download queue

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeDelta};
use strum::Display;
use tracing::error;

use super::pagination::fetch_all_pages;
use super::{Service, expect_array, params, protocol_id};
use crate::config::defaults::DEFAULT_QUEUE_PAGE_SIZE;
use crate::errors::{AppError, AppResult};
use crate::points::{MetricPoint, cycle_timestamp};
use crate::structures::{SonarrEpisode, SonarrQueueItem, decode_all};
use crate::utils::hashing::identity_hash;
use crate::utils::http_client::ApiClient;

const MEASUREMENT: &str = "Sonarr";
const CALENDAR_ENDPOINT: &str = "/api/v3/calendar/";
const QUEUE_ENDPOINT: &str = "/api/v3/queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SonarrMetric {
    Missing,
    Future,
    Queue,
}

pub struct SonarrApi {
    server_id: u32,
    client: Arc<dyn ApiClient>,
    missing_days: i64,
    future_days: i64,
}

impl SonarrApi {
    pub fn new(server_id: u32, client: Arc<dyn ApiClient>, missing_days: i64, future_days: i64) -> Self {
        Self {
            server_id,
            client,
            missing_days,
            future_days,
        }
    }

    /// Calendar window for a query, relative to `today`
    fn window(&self, query: SonarrMetric, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
        let (days, window) = match query {
            SonarrMetric::Future => (
                self.future_days,
                TimeDelta::try_days(self.future_days)
                    .and_then(|d| today.checked_add_signed(d))
                    .map(|end| (today, end)),
            ),
            _ => (
                self.missing_days,
                TimeDelta::try_days(self.missing_days)
                    .and_then(|d| today.checked_sub_signed(d))
                    .map(|start| (start, today)),
            ),
        };
        window.ok_or_else(|| {
            AppError::configuration(format!(
                "{}: {days} days from {today} is outside the calendar range",
                self.label()
            ))
        })
    }

    /// Episodes airing in the calendar window.
    ///
    /// `Missing` emits a single summary of monitored episodes without a file.
    /// `Future` emits a summary plus one point per episode.
    pub async fn calendar(&self, query: SonarrMetric) -> AppResult<Vec<MetricPoint>> {
        let (start, end) = self.window(query, Local::now().date_naive())?;
        let body = self
            .client
            .get_json(
                CALENDAR_ENDPOINT,
                params([
                    ("start", start.to_string()),
                    ("end", end.to_string()),
                    ("includeSeries", "true".to_string()),
                ]),
            )
            .await?;
        let items = expect_array(&self.label(), body)?;
        let now = cycle_timestamp();
        let episodes: Vec<SonarrEpisode> = decode_all(&items);

        if query == SonarrMetric::Missing {
            let mut count = 0_i64;
            let mut shows = HashSet::new();
            let mut seasons = HashSet::new();
            for episode in episodes
                .iter()
                .filter(|e| e.is_monitored() && !e.is_downloaded())
            {
                count += 1;
                let series_id = episode.owning_series_id();
                shows.insert(series_id);
                seasons.insert((series_id, episode.season_number));
            }

            return Ok(vec![
                MetricPoint::new(MEASUREMENT, now)
                    .tag("type", query)
                    .tag("server", self.server_id)
                    .field("count", count)
                    .field("show_count", shows.len())
                    .field("season_count", seasons.len())
                    .field("episode_count", count),
            ]);
        }

        let mut points = Vec::with_capacity(episodes.len() + 1);
        points.push(
            MetricPoint::new(MEASUREMENT, now)
                .tag("type", query)
                .tag("server", self.server_id)
                .field("count", episodes.len())
                .field("show_count", 0_i64)
                .field("season_count", 0_i64)
                .field("episode_count", 0_i64),
        );

        for episode in &episodes {
            let series_title = episode
                .series
                .as_ref()
                .and_then(|s| s.title.clone())
                .unwrap_or_default();
            let sxe = episode.sxe();
            points.push(
                MetricPoint::new(MEASUREMENT, now)
                    .tag("type", query)
                    .tag(
                        "sonarrId",
                        episode.owning_series_id().unwrap_or_default(),
                    )
                    .tag("server", self.server_id)
                    .tag("name", &series_title)
                    .tag("epname", episode.title.as_deref().unwrap_or_default())
                    .tag("sxe", &sxe)
                    .tag("airsUTC", episode.air_date_utc.as_deref().unwrap_or_default())
                    .tag("downloaded", i64::from(episode.is_downloaded()))
                    .field("hash", identity_hash(&self.server_id, &series_title, &sxe)),
            );
        }
        Ok(points)
    }

    /// Every item in the download queue, across all pages
    pub async fn queue(&self) -> AppResult<Vec<MetricPoint>> {
        let records = fetch_all_pages(
            self.client.as_ref(),
            QUEUE_ENDPOINT,
            params([
                ("pageSize", DEFAULT_QUEUE_PAGE_SIZE.to_string()),
                ("includeSeries", "true".to_string()),
                ("includeEpisode", "true".to_string()),
                ("includeUnknownSeriesItems", "false".to_string()),
            ]),
        )
        .await?;
        let now = cycle_timestamp();
        let items: Vec<SonarrQueueItem> = decode_all(&records);

        let mut points = Vec::with_capacity(items.len() + 1);
        points.push(
            MetricPoint::new(MEASUREMENT, now)
                .tag("type", SonarrMetric::Queue)
                .tag("server", self.server_id)
                .field("count", items.len()),
        );

        for item in &items {
            let Some(episode) = &item.episode else {
                error!(
                    server = %self.label(),
                    "Dropping queue item {:?} without an episode",
                    item.id
                );
                continue;
            };
            let series_title = item
                .series
                .as_ref()
                .and_then(|s| s.title.clone())
                .unwrap_or_default();
            let protocol = item.protocol.as_deref().unwrap_or_default().to_uppercase();
            let sxe = episode.sxe();

            points.push(
                MetricPoint::new(MEASUREMENT, now)
                    .tag("type", SonarrMetric::Queue)
                    .tag(
                        "sonarrId",
                        item.series_id
                            .or_else(|| episode.owning_series_id())
                            .unwrap_or_default(),
                    )
                    .tag("server", self.server_id)
                    .tag("name", &series_title)
                    .tag("epname", episode.title.as_deref().unwrap_or_default())
                    .tag("sxe", &sxe)
                    .tag("protocol_id", protocol_id(&protocol))
                    .tag("protocol", protocol)
                    .tag(
                        "quality",
                        item.quality.as_ref().map(|q| q.name()).unwrap_or_default(),
                    )
                    .field("hash", identity_hash(&self.server_id, &series_title, &sxe)),
            );
        }
        Ok(points)
    }
}

#[async_trait]
impl Service for SonarrApi {
    type Metric = SonarrMetric;

    fn label(&self) -> String {
        format!("sonarr-{}", self.server_id)
    }

    async fn collect(&self, metric: SonarrMetric) -> AppResult<Vec<MetricPoint>> {
        match metric {
            SonarrMetric::Missing | SonarrMetric::Future => self.calendar(metric).await,
            SonarrMetric::Queue => self.queue().await,
        }
    }
}
