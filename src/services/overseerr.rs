//! Overseerr: request totals and the most recent requests

use std::sync::Arc;

use async_trait::async_trait;
use strum::Display;
use tracing::warn;

use super::{Service, params};
use crate::errors::AppResult;
use crate::points::{MetricPoint, cycle_timestamp};
use crate::structures::{
    OverseerrRequest, OverseerrRequestCounts, OverseerrRequestPage, OverseerrTitle, decode,
    decode_all,
};
use crate::utils::hashing::identity_hash;
use crate::utils::http_client::ApiClient;

const MEASUREMENT: &str = "Overseerr";
const COUNT_ENDPOINT: &str = "/api/v1/request/count";
const REQUEST_ENDPOINT: &str = "/api/v1/request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OverseerrMetric {
    #[strum(serialize = "Request_Counts")]
    RequestCounts,
    #[strum(serialize = "Requests")]
    LatestRequests,
}

pub struct OverseerrApi {
    server_id: u32,
    client: Arc<dyn ApiClient>,
    latest_requests: u32,
}

impl OverseerrApi {
    pub fn new(server_id: u32, client: Arc<dyn ApiClient>, latest_requests: u32) -> Self {
        Self {
            server_id,
            client,
            latest_requests,
        }
    }

    /// Request totals broken down by state and media type
    pub async fn request_counts(&self) -> AppResult<Vec<MetricPoint>> {
        let body = self.client.get_json(COUNT_ENDPOINT, Vec::new()).await?;
        let counts: OverseerrRequestCounts = decode(&body)?;
        let now = cycle_timestamp();

        Ok(vec![
            MetricPoint::new(MEASUREMENT, now)
                .tag("type", OverseerrMetric::RequestCounts)
                .tag("server", self.server_id)
                .field("pending", counts.pending.unwrap_or_default())
                .field("approved", counts.approved.unwrap_or_default())
                .field("processing", counts.processing.unwrap_or_default())
                .field("available", counts.available.unwrap_or_default())
                .field("total", counts.total.unwrap_or_default())
                .field("movies", counts.movie.unwrap_or_default())
                .field("tv", counts.tv.unwrap_or_default())
                .field("declined", counts.declined.unwrap_or_default()),
        ])
    }

    /// The newest requests, each resolved to its movie or show title
    pub async fn latest_requests(&self) -> AppResult<Vec<MetricPoint>> {
        let body = self
            .client
            .get_json(
                REQUEST_ENDPOINT,
                params([
                    ("take", self.latest_requests.to_string()),
                    ("filter", "all".to_string()),
                    ("sort", "added".to_string()),
                ]),
            )
            .await?;
        let page: OverseerrRequestPage = decode(&body)?;
        let requests: Vec<OverseerrRequest> = decode_all(&page.results);

        let mut resolved = Vec::with_capacity(requests.len());
        for request in &requests {
            let (kind, request_type) = match request.media_type() {
                Some("movie") => ("movie", 1_i64),
                Some("tv") => ("tv", 0_i64),
                other => {
                    warn!(
                        server = %self.label(),
                        "Skipping request {:?} with media type {:?}",
                        request.id,
                        other
                    );
                    continue;
                }
            };
            let Some(tmdb_id) = request.media.as_ref().and_then(|m| m.tmdb_id) else {
                warn!(
                    server = %self.label(),
                    "Skipping request {:?} without a TMDB id",
                    request.id
                );
                continue;
            };

            let endpoint = format!("/api/v1/{kind}/{tmdb_id}");
            let details: OverseerrTitle = decode(&self.client.get_json(&endpoint, Vec::new()).await?)?;
            resolved.push((request, request_type, tmdb_id, details.label()));
        }

        let now = cycle_timestamp();
        let mut points = Vec::with_capacity(resolved.len() + 1);
        points.push(
            MetricPoint::new(MEASUREMENT, now)
                .tag("type", OverseerrMetric::LatestRequests)
                .tag("server", self.server_id)
                .field("count", resolved.len()),
        );

        for (request, request_type, tmdb_id, title) in resolved {
            points.push(
                MetricPoint::new(MEASUREMENT, now)
                    .tag("type", OverseerrMetric::LatestRequests)
                    .tag("server", self.server_id)
                    .tag("request_type", request_type)
                    .tag(
                        "status",
                        request
                            .media
                            .as_ref()
                            .and_then(|m| m.status)
                            .unwrap_or_default(),
                    )
                    .tag("title", &title)
                    .tag(
                        "requested_user",
                        request
                            .requested_by
                            .as_ref()
                            .map(|u| u.label())
                            .unwrap_or_default(),
                    )
                    .tag(
                        "requested_date",
                        request.created_at.as_deref().unwrap_or_default(),
                    )
                    .field(
                        "hash",
                        identity_hash(&self.server_id, &title, &tmdb_id.to_string()),
                    ),
            );
        }
        Ok(points)
    }
}

#[async_trait]
impl Service for OverseerrApi {
    type Metric = OverseerrMetric;

    fn label(&self) -> String {
        format!("overseerr-{}", self.server_id)
    }

    async fn collect(&self, metric: OverseerrMetric) -> AppResult<Vec<MetricPoint>> {
        match metric {
            OverseerrMetric::RequestCounts => self.request_counts().await,
            OverseerrMetric::LatestRequests => self.latest_requests().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceError;
    use crate::points::FieldValue;
    use crate::utils::http_client::MockApiClient;
    use serde_json::json;

    fn api(client: MockApiClient) -> OverseerrApi {
        OverseerrApi::new(1, Arc::new(client), 5)
    }

    #[tokio::test]
    async fn test_request_counts_default_missing_counters_to_zero() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .withf(|endpoint, _| endpoint == COUNT_ENDPOINT)
            .returning(|_, _| Ok(json!({"total": 12, "movie": 8, "tv": 4, "pending": 2})));

        let points = api(client).request_counts().await.unwrap();
        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.tag_value("type"), Some("Request_Counts"));
        assert_eq!(point.field_value("total"), Some(&FieldValue::Integer(12)));
        assert_eq!(point.field_value("movies"), Some(&FieldValue::Integer(8)));
        assert_eq!(point.field_value("declined"), Some(&FieldValue::Integer(0)));
    }

    #[tokio::test]
    async fn test_latest_requests_resolve_titles() {
        let mut client = MockApiClient::new();
        client.expect_get_json().returning(|endpoint, params| match endpoint {
            REQUEST_ENDPOINT => {
                assert!(params.contains(&("take".to_string(), "5".to_string())));
                Ok(json!({
                    "pageInfo": {"results": 3},
                    "results": [
                        {
                            "id": 1, "type": "movie", "createdAt": "2024-05-01T10:00:00.000Z",
                            "media": {"tmdbId": 949, "status": 5},
                            "requestedBy": {"displayName": "Ada"}
                        },
                        {"id": 2, "type": "tv", "media": {"tmdbId": 82856, "status": 3}},
                        {"id": 3, "type": "music", "media": {"tmdbId": 1}}
                    ]
                }))
            }
            "/api/v1/movie/949" => Ok(json!({"id": 949, "title": "Heat"})),
            "/api/v1/tv/82856" => Ok(json!({"id": 82856, "name": "The Mandalorian"})),
            other => panic!("unexpected endpoint {other}"),
        });

        let points = api(client).latest_requests().await.unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].field_value("count"), Some(&FieldValue::Integer(2)));

        let movie = &points[1];
        assert_eq!(movie.tag_value("title"), Some("Heat"));
        assert_eq!(movie.tag_value("request_type"), Some("1"));
        assert_eq!(movie.tag_value("status"), Some("5"));
        assert_eq!(movie.tag_value("requested_user"), Some("Ada"));
        assert_eq!(movie.tag_value("requested_date"), Some("2024-05-01T10:00:00.000Z"));

        let show = &points[2];
        assert_eq!(show.tag_value("title"), Some("The Mandalorian"));
        assert_eq!(show.tag_value("request_type"), Some("0"));
        assert_eq!(show.tag_value("requested_user"), Some(""));
    }

    #[tokio::test]
    async fn test_failed_title_lookup_fails_the_cycle() {
        let mut client = MockApiClient::new();
        client.expect_get_json().returning(|endpoint, _| {
            if endpoint == REQUEST_ENDPOINT {
                Ok(json!({"results": [{"id": 1, "type": "movie", "media": {"tmdbId": 949}}]}))
            } else {
                Err(SourceError::transport("overseerr-1", "timed out").into())
            }
        });

        assert!(api(client).collect(OverseerrMetric::LatestRequests).await.is_err());
    }
}
