//! Radarr: missing movies and download queue

use std::sync::Arc;

use async_trait::async_trait;
use strum::Display;
use tracing::warn;

use super::pagination::fetch_all_pages;
use super::{Service, expect_array, params, protocol_id};
use crate::config::defaults::DEFAULT_QUEUE_PAGE_SIZE;
use crate::errors::AppResult;
use crate::points::{MetricPoint, cycle_timestamp};
use crate::structures::{RadarrMovie, RadarrQueueItem, decode_all};
use crate::utils::hashing::identity_hash;
use crate::utils::http_client::ApiClient;

const MEASUREMENT: &str = "Radarr";
const MOVIE_ENDPOINT: &str = "/api/v3/movie";
const QUEUE_ENDPOINT: &str = "/api/v3/queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RadarrMetric {
    Missing,
    Queue,
}

pub struct RadarrApi {
    server_id: u32,
    client: Arc<dyn ApiClient>,
}

impl RadarrApi {
    pub fn new(server_id: u32, client: Arc<dyn ApiClient>) -> Self {
        Self { server_id, client }
    }

    /// Monitored movies without a file
    pub async fn missing(&self) -> AppResult<Vec<MetricPoint>> {
        let body = self.client.get_json(MOVIE_ENDPOINT, Vec::new()).await?;
        let items = expect_array(&self.label(), body)?;
        let now = cycle_timestamp();
        let movies: Vec<RadarrMovie> = decode_all(&items);

        let missing: Vec<&RadarrMovie> = movies.iter().filter(|m| m.is_missing()).collect();
        let available = missing
            .iter()
            .filter(|m| m.is_available.unwrap_or(false))
            .count();

        let mut points = Vec::with_capacity(missing.len() + 1);
        points.push(
            MetricPoint::new(MEASUREMENT, now)
                .tag("type", RadarrMetric::Missing)
                .tag("server", self.server_id)
                .field("count", missing.len())
                .field("available_count", available),
        );

        for movie in missing {
            let name = movie.display_name();
            let tmdb_id = movie.tmdb_id.unwrap_or_default();
            points.push(
                MetricPoint::new(MEASUREMENT, now)
                    .tag("type", RadarrMetric::Missing)
                    .tag(
                        "Missing_Available",
                        i64::from(!movie.is_available.unwrap_or(false)),
                    )
                    .tag("tmdbId", tmdb_id)
                    .tag("server", self.server_id)
                    .tag("name", &name)
                    .tag("titleSlug", movie.title_slug.as_deref().unwrap_or_default())
                    .field(
                        "hash",
                        identity_hash(&self.server_id, &name, &tmdb_id.to_string()),
                    ),
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
                ("includeMovie", "true".to_string()),
                ("includeUnknownMovieItems", "false".to_string()),
            ]),
        )
        .await?;
        let now = cycle_timestamp();
        let items: Vec<RadarrQueueItem> = decode_all(&records);

        let mut points = Vec::with_capacity(items.len() + 1);
        points.push(
            MetricPoint::new(MEASUREMENT, now)
                .tag("type", RadarrMetric::Queue)
                .tag("server", self.server_id)
                .field("count", items.len()),
        );

        for item in &items {
            let Some(movie) = &item.movie else {
                warn!(
                    server = %self.label(),
                    "Skipping queue item {:?} without a movie",
                    item.id
                );
                continue;
            };
            let name = movie.display_name();
            let quality = item.quality.as_ref().map(|q| q.name()).unwrap_or_default();
            let protocol = item.protocol.as_deref().unwrap_or_default().to_uppercase();

            points.push(
                MetricPoint::new(MEASUREMENT, now)
                    .tag("type", RadarrMetric::Queue)
                    .tag("tmdbId", movie.tmdb_id.unwrap_or_default())
                    .tag("server", self.server_id)
                    .tag("name", &name)
                    .tag("quality", &quality)
                    .tag("protocol_id", protocol_id(&protocol))
                    .tag("protocol", protocol)
                    .tag("titleSlug", movie.title_slug.as_deref().unwrap_or_default())
                    .field("hash", identity_hash(&self.server_id, &name, &quality)),
            );
        }
        Ok(points)
    }
}

#[async_trait]
impl Service for RadarrApi {
    type Metric = RadarrMetric;

    fn label(&self) -> String {
        format!("radarr-{}", self.server_id)
    }

    async fn collect(&self, metric: RadarrMetric) -> AppResult<Vec<MetricPoint>> {
        match metric {
            RadarrMetric::Missing => self.missing().await,
            RadarrMetric::Queue => self.queue().await,
        }
    }
}
