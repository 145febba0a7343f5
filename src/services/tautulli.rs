//! Tautulli: current streams and library sizes

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use strum::Display;

use super::{Service, expect_array, params};
use crate::errors::{AppResult, SourceError};
use crate::points::{FieldValue, MetricPoint, cycle_timestamp};
use crate::structures::{
    TautulliActivity, TautulliLibrary, TautulliResponse, TautulliSession, decode, decode_all,
};
use crate::utils::hashing::identity_hash;
use crate::utils::http_client::ApiClient;

const MEASUREMENT: &str = "Tautulli";
const API_ENDPOINT: &str = "/api/v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TautulliMetric {
    #[strum(serialize = "current_stream_stats")]
    Activity,
    #[strum(serialize = "Library_stats")]
    LibraryStats,
}

pub struct TautulliApi {
    server_id: u32,
    client: Arc<dyn ApiClient>,
}

fn whole(value: Option<f64>) -> FieldValue {
    value.map(|v| v.round() as i64).into()
}

/// Resolution label for a session, following the transcoded stream when there is one
fn session_quality(session: &TautulliSession) -> String {
    let resolution = if session.video_decision.as_deref() == Some("transcode") {
        session.stream_video_resolution.as_deref()
    } else {
        session.video_resolution.as_deref()
    };

    match resolution.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) if r.eq_ignore_ascii_case("sd") => "SD".to_string(),
        Some(r) if r.eq_ignore_ascii_case("4k") => "4K".to_string(),
        Some(r) if r.chars().all(|c| c.is_ascii_digit()) => format!("{r}p"),
        Some(r) => r.to_string(),
        None => session.quality_profile.clone().unwrap_or_default(),
    }
}

impl TautulliApi {
    pub fn new(server_id: u32, client: Arc<dyn ApiClient>) -> Self {
        Self { server_id, client }
    }

    /// Run an API command and unwrap its `response.data`
    async fn command(&self, cmd: &str) -> AppResult<Value> {
        let body = self
            .client
            .get_json(API_ENDPOINT, params([("cmd", cmd.to_string())]))
            .await?;
        let response: TautulliResponse = decode(&body)?;
        let envelope = response
            .response
            .ok_or_else(|| SourceError::payload(self.label(), "missing response envelope"))?;

        if envelope.result.as_deref() != Some("success") {
            return Err(SourceError::rejected(
                self.label(),
                envelope
                    .message
                    .unwrap_or_else(|| format!("{cmd} returned {:?}", envelope.result)),
            )
            .into());
        }
        Ok(envelope.data)
    }

    /// Stream totals plus one point per active session
    pub async fn activity(&self) -> AppResult<Vec<MetricPoint>> {
        let data = self.command("get_activity").await?;
        let activity: TautulliActivity = decode(&data)?;
        let now = cycle_timestamp();
        let sessions: Vec<TautulliSession> = decode_all(&activity.sessions);

        let mut points = Vec::with_capacity(sessions.len() + 1);
        points.push(
            MetricPoint::new(MEASUREMENT, now)
                .tag("type", TautulliMetric::Activity)
                .tag("server", self.server_id)
                .field("stream_count", whole(activity.stream_count))
                .field("total_bandwidth", whole(activity.total_bandwidth))
                .field("wan_bandwidth", whole(activity.wan_bandwidth))
                .field("lan_bandwidth", whole(activity.lan_bandwidth))
                .field("transcode_streams", whole(activity.stream_count_transcode))
                .field("direct_play_streams", whole(activity.stream_count_direct_play))
                .field("direct_streams", whole(activity.stream_count_direct_stream)),
        );

        for session in &sessions {
            let session_id = session.session_id.clone().unwrap_or_default();
            let title = session.display_title();
            let text = |v: &Option<String>| v.clone().unwrap_or_default();

            points.push(
                MetricPoint::new(MEASUREMENT, now)
                    .tag("type", "Session")
                    .tag("session_id", &session_id)
                    .tag("friendly_name", text(&session.friendly_name))
                    .tag("username", text(&session.username))
                    .tag("title", &title)
                    .tag("product", text(&session.product))
                    .tag("platform", text(&session.platform))
                    .tag("quality", session_quality(session))
                    .tag("video_decision", text(&session.video_decision))
                    .tag("transcode_decision", text(&session.transcode_decision))
                    .tag("media_type", text(&session.media_type))
                    .tag("player_state", session.player_state())
                    .tag("location", text(&session.location))
                    .tag("server", self.server_id)
                    .field("hash", identity_hash(&self.server_id, &session_id, &title)),
            );
        }
        Ok(points)
    }

    /// Item counts per library section
    pub async fn library_stats(&self) -> AppResult<Vec<MetricPoint>> {
        let data = self.command("get_libraries").await?;
        let items = expect_array(&self.label(), data)?;
        let now = cycle_timestamp();
        let libraries: Vec<TautulliLibrary> = decode_all(&items);

        let mut points = Vec::with_capacity(libraries.len() + 1);
        points.push(
            MetricPoint::new(MEASUREMENT, now)
                .tag("type", TautulliMetric::LibraryStats)
                .tag("server", self.server_id)
                .field("count", libraries.len()),
        );

        for library in &libraries {
            points.push(
                MetricPoint::new(MEASUREMENT, now)
                    .tag("type", TautulliMetric::LibraryStats)
                    .tag("server", self.server_id)
                    .tag(
                        "section_name",
                        library.section_name.as_deref().unwrap_or_default(),
                    )
                    .tag(
                        "section_type",
                        library.section_type.as_deref().unwrap_or_default(),
                    )
                    .field("total", whole(library.count))
                    .field("parents", whole(library.parent_count))
                    .field("children", whole(library.child_count)),
            );
        }
        Ok(points)
    }
}

#[async_trait]
impl Service for TautulliApi {
    type Metric = TautulliMetric;

    fn label(&self) -> String {
        format!("tautulli-{}", self.server_id)
    }

    async fn collect(&self, metric: TautulliMetric) -> AppResult<Vec<MetricPoint>> {
        match metric {
            TautulliMetric::Activity => self.activity().await,
            TautulliMetric::LibraryStats => self.library_stats().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::utils::http_client::MockApiClient;
    use serde_json::json;

    fn api(client: MockApiClient) -> TautulliApi {
        TautulliApi::new(3, Arc::new(client))
    }

    fn envelope(data: Value) -> Value {
        json!({"response": {"result": "success", "message": null, "data": data}})
    }

    #[tokio::test]
    async fn test_activity_summary_and_sessions() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .withf(|endpoint, params| {
                endpoint == API_ENDPOINT
                    && params.contains(&("cmd".to_string(), "get_activity".to_string()))
            })
            .returning(|_, _| {
                Ok(envelope(json!({
                    "stream_count": "2",
                    "stream_count_transcode": 1,
                    "stream_count_direct_play": "1",
                    "stream_count_direct_stream": "0",
                    "total_bandwidth": 24000,
                    "lan_bandwidth": "",
                    "wan_bandwidth": "24000",
                    "sessions": [
                        {
                            "session_id": "abc", "friendly_name": "Ada", "full_title": "Bluey - Sleepytime",
                            "state": "paused", "video_decision": "transcode",
                            "video_resolution": "1080", "stream_video_resolution": "720",
                            "media_type": "episode", "location": "wan"
                        },
                        {"session_id": "def", "title": "Heat", "state": "playing", "video_resolution": "4k"}
                    ]
                })))
            });

        let points = api(client).activity().await.unwrap();
        assert_eq!(points.len(), 3);

        let summary = &points[0];
        assert_eq!(summary.tag_value("type"), Some("current_stream_stats"));
        assert_eq!(summary.field_value("stream_count"), Some(&FieldValue::Integer(2)));
        assert_eq!(summary.field_value("transcode_streams"), Some(&FieldValue::Integer(1)));
        assert_eq!(summary.field_value("lan_bandwidth"), Some(&FieldValue::Absent));

        let paused = &points[1];
        assert_eq!(paused.tag_value("type"), Some("Session"));
        assert_eq!(paused.tag_value("player_state"), Some("1"));
        assert_eq!(paused.tag_value("quality"), Some("720p"));
        assert_eq!(paused.tag_value("title"), Some("Bluey - Sleepytime"));
        assert_eq!(
            paused.field_value("hash"),
            Some(&FieldValue::Text(identity_hash(&3, "abc", "Bluey - Sleepytime")))
        );

        let playing = &points[2];
        assert_eq!(playing.tag_value("player_state"), Some("0"));
        assert_eq!(playing.tag_value("quality"), Some("4K"));
    }

    #[tokio::test]
    async fn test_failed_envelope_aborts_cycle() {
        let mut client = MockApiClient::new();
        client.expect_get_json().returning(|_, _| {
            Ok(json!({"response": {"result": "error", "message": "Invalid apikey", "data": {}}}))
        });

        let err = api(client).collect(TautulliMetric::Activity).await.unwrap_err();
        assert!(matches!(err, AppError::Source(SourceError::Rejected { .. })));
        assert!(err.to_string().contains("Invalid apikey"));
    }

    #[tokio::test]
    async fn test_library_stats() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .withf(|_, params| params.contains(&("cmd".to_string(), "get_libraries".to_string())))
            .returning(|_, _| {
                Ok(envelope(json!([
                    {"section_id": "1", "section_name": "Movies", "section_type": "movie", "count": "512"},
                    {"section_id": 2, "section_name": "TV Shows", "section_type": "show",
                     "count": "40", "parent_count": "120", "child_count": "2400"}
                ])))
            });

        let points = api(client).library_stats().await.unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].field_value("count"), Some(&FieldValue::Integer(2)));

        let movies = &points[1];
        assert_eq!(movies.tag_value("section_name"), Some("Movies"));
        assert_eq!(movies.field_value("total"), Some(&FieldValue::Integer(512)));
        assert_eq!(movies.field_value("parents"), Some(&FieldValue::Absent));

        let shows = &points[2];
        assert_eq!(shows.field_value("children"), Some(&FieldValue::Integer(2400)));
    }

    #[test]
    fn test_session_quality_falls_back_to_profile() {
        let session: TautulliSession =
            decode(&json!({"quality_profile": "Original"})).unwrap();
        assert_eq!(session_quality(&session), "Original");

        let session: TautulliSession = decode(&json!({"video_resolution": "sd"})).unwrap();
        assert_eq!(session_quality(&session), "SD");
    }
}
