//! Sonarr v3 records

use serde_json::Value;

use super::record::record;
use super::shared::QualityModel;

record! {
    pub struct SonarrSeries {
        "id" => id: Option<i64>,
        "title" => title: Option<String>,
        "sortTitle" => sort_title: Option<String>,
        "titleSlug" => title_slug: Option<String>,
        "status" => status: Option<String>,
        "network" => network: Option<String>,
        "year" => year: Option<i64>,
        "monitored" => monitored: Option<bool>,
        "seriesType" => series_type: Option<String>,
        "tvdbId" => tvdb_id: Option<i64>,
        "imdbId" => imdb_id: Option<String>,
        "path" => path: Option<String>,
        "genres" => genres: Vec<String>,
        "statistics" => statistics: Option<Value>,
    }
}

record! {
    /// An episode as returned by `/calendar` and embedded in queue items
    pub struct SonarrEpisode {
        "id" => id: Option<i64>,
        "seriesId" => series_id: Option<i64>,
        "tvdbId" => tvdb_id: Option<i64>,
        "episodeFileId" => episode_file_id: Option<i64>,
        "seasonNumber" => season_number: Option<i64>,
        "episodeNumber" => episode_number: Option<i64>,
        "absoluteEpisodeNumber" => absolute_episode_number: Option<i64>,
        "title" => title: Option<String>,
        "airDate" => air_date: Option<String>,
        "airDateUtc" => air_date_utc: Option<String>,
        "runtime" => runtime: Option<i64>,
        "overview" => overview: Option<String>,
        "hasFile" => has_file: Option<bool>,
        "monitored" => monitored: Option<bool>,
        "grabbed" => grabbed: Option<bool>,
        "finaleType" => finale_type: Option<String>,
        "series" => series: Option<SonarrSeries>,
    }
}

record! {
    pub struct SonarrQueueItem {
        "id" => id: Option<i64>,
        "seriesId" => series_id: Option<i64>,
        "episodeId" => episode_id: Option<i64>,
        "seasonNumber" => season_number: Option<i64>,
        "title" => title: Option<String>,
        "status" => status: Option<String>,
        "trackedDownloadStatus" => tracked_download_status: Option<String>,
        "trackedDownloadState" => tracked_download_state: Option<String>,
        "protocol" => protocol: Option<String>,
        "downloadClient" => download_client: Option<String>,
        "downloadId" => download_id: Option<String>,
        "indexer" => indexer: Option<String>,
        "size" => size: Option<f64>,
        "sizeleft" => sizeleft: Option<f64>,
        "timeleft" => timeleft: Option<String>,
        "estimatedCompletionTime" => estimated_completion_time: Option<String>,
        "errorMessage" => error_message: Option<String>,
        "quality" => quality: Option<QualityModel>,
        "series" => series: Option<SonarrSeries>,
        "episode" => episode: Option<SonarrEpisode>,
    }
}

impl SonarrEpisode {
    /// `S01E02` style label
    pub fn sxe(&self) -> String {
        format!(
            "S{:0>2}E{:0>2}",
            self.season_number.unwrap_or_default(),
            self.episode_number.unwrap_or_default()
        )
    }

    /// Owning series id, falling back to the embedded series object
    pub fn owning_series_id(&self) -> Option<i64> {
        self.series_id
            .or_else(|| self.series.as_ref().and_then(|s| s.id))
    }

    pub fn is_downloaded(&self) -> bool {
        self.has_file.unwrap_or(false)
    }

    pub fn is_monitored(&self) -> bool {
        self.monitored.unwrap_or(false)
    }
}
