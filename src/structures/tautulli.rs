//! Tautulli v2 records
//!
//! Tautulli renders most numbers as strings, and not consistently across
//! releases, so nearly every field goes through a lenient deserializer.

use serde_json::Value;

use super::record::{lenient, record};

record! {
    /// Top-level `{"response": {...}}` wrapper
    pub struct TautulliResponse {
        "response" => response: Option<TautulliEnvelope>,
    }
}

record! {
    pub struct TautulliEnvelope {
        "result" => result: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "message" => message: Option<String>,
        "data" => data: Value,
    }
}

record! {
    /// `cmd=get_activity`
    pub struct TautulliActivity {
        #[serde(deserialize_with = "lenient::number")]
        "stream_count" => stream_count: Option<f64>,
        #[serde(deserialize_with = "lenient::number")]
        "stream_count_direct_play" => stream_count_direct_play: Option<f64>,
        #[serde(deserialize_with = "lenient::number")]
        "stream_count_direct_stream" => stream_count_direct_stream: Option<f64>,
        #[serde(deserialize_with = "lenient::number")]
        "stream_count_transcode" => stream_count_transcode: Option<f64>,
        #[serde(deserialize_with = "lenient::number")]
        "total_bandwidth" => total_bandwidth: Option<f64>,
        #[serde(deserialize_with = "lenient::number")]
        "lan_bandwidth" => lan_bandwidth: Option<f64>,
        #[serde(deserialize_with = "lenient::number")]
        "wan_bandwidth" => wan_bandwidth: Option<f64>,
        "sessions" => sessions: Vec<Value>,
    }
}

record! {
    /// One entry of `get_activity.sessions`
    pub struct TautulliSession {
        #[serde(deserialize_with = "lenient::string")]
        "session_id" => session_id: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "session_key" => session_key: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "friendly_name" => friendly_name: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "username" => username: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "title" => title: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "full_title" => full_title: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "grandparent_title" => grandparent_title: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "media_type" => media_type: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "product" => product: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "platform" => platform: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "player" => player: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "state" => state: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "quality_profile" => quality_profile: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "video_resolution" => video_resolution: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "stream_video_resolution" => stream_video_resolution: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "video_decision" => video_decision: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "transcode_decision" => transcode_decision: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "location" => location: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "ip_address" => ip_address: Option<String>,
        #[serde(deserialize_with = "lenient::number")]
        "progress_percent" => progress_percent: Option<f64>,
        #[serde(deserialize_with = "lenient::number")]
        "bandwidth" => bandwidth: Option<f64>,
    }
}

record! {
    /// One entry of `cmd=get_libraries`
    pub struct TautulliLibrary {
        #[serde(deserialize_with = "lenient::string")]
        "section_id" => section_id: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "section_name" => section_name: Option<String>,
        #[serde(deserialize_with = "lenient::string")]
        "section_type" => section_type: Option<String>,
        #[serde(deserialize_with = "lenient::number")]
        "count" => count: Option<f64>,
        #[serde(deserialize_with = "lenient::number")]
        "parent_count" => parent_count: Option<f64>,
        #[serde(deserialize_with = "lenient::number")]
        "child_count" => child_count: Option<f64>,
    }
}

impl TautulliSession {
    /// Numeric player state: 0 playing, 1 paused, 2 buffering, 3 anything else
    pub fn player_state(&self) -> i64 {
        match self.state.as_deref() {
            Some("playing") => 0,
            Some("paused") => 1,
            Some("buffering") => 2,
            _ => 3,
        }
    }

    /// Title shown on dashboards; episodes are prefixed with their show
    pub fn display_title(&self) -> String {
        if let Some(full) = self.full_title.as_deref().filter(|t| !t.is_empty()) {
            return full.to_string();
        }
        match (self.grandparent_title.as_deref(), self.title.as_deref()) {
            (Some(show), Some(title)) if !show.is_empty() => format!("{show} - {title}"),
            (_, Some(title)) => title.to_string(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::decode;
    use serde_json::json;

    #[test]
    fn test_activity_accepts_string_counters() {
        let activity: TautulliActivity = decode(&json!({
            "stream_count": "2",
            "total_bandwidth": 12000,
            "lan_bandwidth": "",
            "sessions": [{"session_id": "abc"}]
        }))
        .unwrap();
        assert_eq!(activity.stream_count, Some(2.0));
        assert_eq!(activity.total_bandwidth, Some(12000.0));
        assert_eq!(activity.lan_bandwidth, None);
        assert_eq!(activity.sessions.len(), 1);
    }

    #[test]
    fn test_player_state_mapping() {
        for (state, expected) in [("playing", 0), ("paused", 1), ("buffering", 2), ("error", 3)] {
            let session: TautulliSession = decode(&json!({"state": state})).unwrap();
            assert_eq!(session.player_state(), expected);
        }
    }

    #[test]
    fn test_display_title_prefers_full_title() {
        let session: TautulliSession =
            decode(&json!({"full_title": "Bluey - Sleepytime", "title": "Sleepytime"})).unwrap();
        assert_eq!(session.display_title(), "Bluey - Sleepytime");

        let session: TautulliSession =
            decode(&json!({"grandparent_title": "Bluey", "title": "Sleepytime"})).unwrap();
        assert_eq!(session.display_title(), "Bluey - Sleepytime");
    }
}
