//! Shared helpers for the pollers

pub mod hashing;
pub mod http_client;
pub mod url;

pub use hashing::identity_hash;
pub use http_client::{ApiClient, ApiKeyPlacement, HttpApiClient};
pub use url::UrlUtils;
