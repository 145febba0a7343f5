//! Overseerr v1 records

use serde_json::Value;

use super::record::record;

record! {
    /// `/api/v1/request/count`
    pub struct OverseerrRequestCounts {
        "total" => total: Option<i64>,
        "movie" => movie: Option<i64>,
        "tv" => tv: Option<i64>,
        "pending" => pending: Option<i64>,
        "approved" => approved: Option<i64>,
        "declined" => declined: Option<i64>,
        "processing" => processing: Option<i64>,
        "available" => available: Option<i64>,
    }
}

record! {
    /// `/api/v1/request` listing envelope
    pub struct OverseerrRequestPage {
        "pageInfo" => page_info: Option<Value>,
        "results" => results: Vec<Value>,
    }
}

record! {
    pub struct OverseerrRequest {
        "id" => id: Option<i64>,
        "status" => status: Option<i64>,
        "type" => request_type: Option<String>,
        "is4k" => is_4k: Option<bool>,
        "createdAt" => created_at: Option<String>,
        "updatedAt" => updated_at: Option<String>,
        "media" => media: Option<OverseerrMedia>,
        "requestedBy" => requested_by: Option<OverseerrUser>,
    }
}

record! {
    pub struct OverseerrMedia {
        "id" => id: Option<i64>,
        "mediaType" => media_type: Option<String>,
        "tmdbId" => tmdb_id: Option<i64>,
        "tvdbId" => tvdb_id: Option<i64>,
        "status" => status: Option<i64>,
    }
}

record! {
    pub struct OverseerrUser {
        "id" => id: Option<i64>,
        "email" => email: Option<String>,
        "username" => username: Option<String>,
        "plexUsername" => plex_username: Option<String>,
        "displayName" => display_name: Option<String>,
    }
}

record! {
    /// Movie or TV details; movies carry `title`, shows carry `name`
    pub struct OverseerrTitle {
        "id" => id: Option<i64>,
        "title" => title: Option<String>,
        "name" => name: Option<String>,
        "releaseDate" => release_date: Option<String>,
        "firstAirDate" => first_air_date: Option<String>,
    }
}

impl OverseerrRequest {
    /// Media type of the request, preferring the request's own field
    pub fn media_type(&self) -> Option<&str> {
        self.request_type
            .as_deref()
            .or_else(|| self.media.as_ref().and_then(|m| m.media_type.as_deref()))
    }
}

impl OverseerrUser {
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.username.clone())
            .or_else(|| self.plex_username.clone())
            .or_else(|| self.email.clone())
            .unwrap_or_default()
    }
}

impl OverseerrTitle {
    pub fn label(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }
}
