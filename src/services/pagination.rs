//! Page-walking for the *arr queue endpoints

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::AppResult;
use crate::structures::{QueuePage, decode};
use crate::utils::http_client::ApiClient;

/// Fetch every page of a paginated listing and return all records.
///
/// The first request carries only `params`; later requests add `page`. Pages
/// are requested until `page * pageSize` reaches `totalRecords`, never past
/// the page count the first page implies, and only while the server keeps
/// answering with the page that was asked for. Any failed page fails the
/// whole walk so callers never see a partial listing.
pub async fn fetch_all_pages(
    client: &dyn ApiClient,
    endpoint: &str,
    params: Vec<(String, String)>,
) -> AppResult<Vec<Value>> {
    let body = client.get_json(endpoint, params.clone()).await?;
    let mut page: QueuePage = decode(&body)?;
    let mut records = std::mem::take(&mut page.records);
    let last_page = page.page_count().unwrap_or_default();

    while page.has_more() {
        if page.page_size <= 0 {
            warn!(
                endpoint,
                "Server reported page size {}; stopping pagination", page.page_size
            );
            break;
        }

        let next = page.page + 1;
        if next > last_page {
            warn!(
                endpoint,
                "Server still reports more records after {} pages; stopping pagination",
                last_page
            );
            break;
        }

        let mut next_params = params.clone();
        next_params.push(("page".to_string(), next.to_string()));
        debug!(endpoint, page = next, "Fetching next page");

        let body = client.get_json(endpoint, next_params).await?;
        page = decode(&body)?;
        if page.page != next {
            warn!(
                endpoint,
                "Asked for page {} but got page {}; stopping pagination", next, page.page
            );
            break;
        }
        if page.records.is_empty() {
            warn!(
                endpoint,
                "Page {} came back empty with {} of {} records fetched",
                next,
                records.len(),
                page.total_records
            );
            break;
        }
        records.append(&mut page.records);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AppError, SourceError};
    use crate::utils::http_client::MockApiClient;
    use serde_json::json;

    fn page(page: i64, total: i64, count: usize) -> Value {
        let records: Vec<Value> = (0..count).map(|i| json!({"id": i})).collect();
        json!({"page": page, "pageSize": 250, "totalRecords": total, "records": records})
    }

    fn page_param(params: &[(String, String)]) -> Option<String> {
        params
            .iter()
            .find(|(k, _)| k == "page")
            .map(|(_, v)| v.clone())
    }

    #[tokio::test]
    async fn test_walks_every_page() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .times(3)
            .returning(|_, params| match page_param(&params).as_deref() {
                None => Ok(page(1, 600, 250)),
                Some("2") => Ok(page(2, 600, 250)),
                Some("3") => Ok(page(3, 600, 100)),
                other => panic!("unexpected page {other:?}"),
            });

        let records = fetch_all_pages(&client, "/api/v3/queue", vec![]).await.unwrap();
        assert_eq!(records.len(), 600);
    }

    #[tokio::test]
    async fn test_single_page_issues_one_request() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .times(1)
            .returning(|_, _| Ok(page(1, 3, 3)));

        let records = fetch_all_pages(&client, "/api/v3/queue", vec![]).await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_page_fails_the_walk() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .returning(|_, params| match page_param(&params).as_deref() {
                None => Ok(page(1, 600, 250)),
                _ => Err(AppError::from(SourceError::transport("sonarr-1", "timed out"))),
            });

        let result = fetch_all_pages(&client, "/api/v3/queue", vec![]).await;
        assert!(matches!(result, Err(AppError::Source(_))));
    }

    #[tokio::test]
    async fn test_empty_page_stops_early() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .times(2)
            .returning(|_, params| match page_param(&params).as_deref() {
                None => Ok(page(1, 600, 250)),
                _ => Ok(page(2, 600, 0)),
            });

        let records = fetch_all_pages(&client, "/api/v3/queue", vec![]).await.unwrap();
        assert_eq!(records.len(), 250);
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_an_error() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .returning(|_, _| Ok(json!(["not", "a", "page"])));

        let result = fetch_all_pages(&client, "/api/v3/queue", vec![]).await;
        assert!(matches!(result, Err(AppError::Decode(_))));
    }

    #[tokio::test]
    async fn test_server_ignoring_page_parameter_stops_the_walk() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .times(2)
            .returning(|_, _| Ok(page(1, 600, 250)));

        let records = fetch_all_pages(&client, "/api/v3/queue", vec![]).await.unwrap();
        assert_eq!(records.len(), 250);
    }

    #[tokio::test]
    async fn test_growing_total_is_capped_at_first_page_count() {
        let mut client = MockApiClient::new();
        client
            .expect_get_json()
            .times(2)
            .returning(|_, params| match page_param(&params).as_deref() {
                None => Ok(page(1, 300, 250)),
                Some("2") => Ok(page(2, 10_000, 250)),
                other => panic!("unexpected page {other:?}"),
            });

        let records = fetch_all_pages(&client, "/api/v3/queue", vec![]).await.unwrap();
        assert_eq!(records.len(), 500);
    }

    #[tokio::test]
    async fn test_null_records_are_an_empty_page() {
        let mut client = MockApiClient::new();
        client.expect_get_json().times(1).returning(|_, _| {
            Ok(json!({"page": 1, "pageSize": 250, "totalRecords": null, "records": null}))
        });

        let records = fetch_all_pages(&client, "/api/v3/queue", vec![]).await.unwrap();
        assert!(records.is_empty());
    }
}
