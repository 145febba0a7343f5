//! Shapes shared by the *arr family of APIs

use serde_json::Value;

use super::record::record;

record! {
    /// One page of a paginated `/api/v3/queue` style listing
    pub struct QueuePage {
        "page" => page: i64,
        "pageSize" => page_size: i64,
        "sortKey" => sort_key: Option<String>,
        "sortDirection" => sort_direction: Option<String>,
        "totalRecords" => total_records: i64,
        "records" => records: Vec<Value>,
    }
}

record! {
    /// Quality wrapper attached to queue items: `{"quality": {"name": ...}}`
    pub struct QualityModel {
        "quality" => quality: Option<Quality>,
        "revision" => revision: Option<Value>,
    }
}

record! {
    pub struct Quality {
        "id" => id: Option<i64>,
        "name" => name: Option<String>,
        "source" => source: Option<String>,
        "resolution" => resolution: Option<i64>,
    }
}

impl QueuePage {
    /// Whether the server reports more records beyond this page
    pub fn has_more(&self) -> bool {
        self.total_records > self.page.saturating_mul(self.page_size)
    }

    /// Number of pages the listing spans, if the page size is usable
    pub fn page_count(&self) -> Option<i64> {
        if self.page_size <= 0 {
            return None;
        }
        Some((self.total_records.max(0) + self.page_size - 1) / self.page_size)
    }
}

impl QualityModel {
    /// The quality name, or an empty string when the server omitted it
    pub fn name(&self) -> String {
        self.quality
            .as_ref()
            .and_then(|q| q.name.clone())
            .unwrap_or_default()
    }
}
