//! Radarr v3 records

use serde_json::Value;

use super::record::record;
use super::shared::QualityModel;

record! {
    pub struct RadarrMovie {
        "id" => id: Option<i64>,
        "title" => title: Option<String>,
        "originalTitle" => original_title: Option<String>,
        "sortTitle" => sort_title: Option<String>,
        "titleSlug" => title_slug: Option<String>,
        "year" => year: Option<i64>,
        "status" => status: Option<String>,
        "studio" => studio: Option<String>,
        "tmdbId" => tmdb_id: Option<i64>,
        "imdbId" => imdb_id: Option<String>,
        "monitored" => monitored: Option<bool>,
        "hasFile" => has_file: Option<bool>,
        "isAvailable" => is_available: Option<bool>,
        "minimumAvailability" => minimum_availability: Option<String>,
        "sizeOnDisk" => size_on_disk: Option<f64>,
        "inCinemas" => in_cinemas: Option<String>,
        "digitalRelease" => digital_release: Option<String>,
        "physicalRelease" => physical_release: Option<String>,
        "movieFile" => movie_file: Option<Value>,
    }
}

record! {
    pub struct RadarrQueueItem {
        "id" => id: Option<i64>,
        "movieId" => movie_id: Option<i64>,
        "title" => title: Option<String>,
        "status" => status: Option<String>,
        "trackedDownloadStatus" => tracked_download_status: Option<String>,
        "trackedDownloadState" => tracked_download_state: Option<String>,
        "protocol" => protocol: Option<String>,
        "downloadClient" => download_client: Option<String>,
        "indexer" => indexer: Option<String>,
        "size" => size: Option<f64>,
        "sizeleft" => sizeleft: Option<f64>,
        "timeleft" => timeleft: Option<String>,
        "quality" => quality: Option<QualityModel>,
        "movie" => movie: Option<RadarrMovie>,
    }
}

impl RadarrMovie {
    /// `Title (Year)` display name
    pub fn display_name(&self) -> String {
        format!(
            "{} ({})",
            self.title.as_deref().unwrap_or_default(),
            self.year.unwrap_or_default()
        )
    }

    pub fn is_missing(&self) -> bool {
        self.monitored.unwrap_or(false) && !self.has_file.unwrap_or(false)
    }
}
