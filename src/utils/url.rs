//! URL helpers for configured server addresses

use url::Url;

use crate::errors::{AppError, AppResult};

/// Query parameters that carry secrets and must not reach the logs
const SENSITIVE_PARAMS: &[&str] = &["apikey", "api_key", "token", "password"];

pub struct UrlUtils;

impl UrlUtils {
    /// Ensure a configured address carries a scheme, defaulting to HTTPS
    ///
    /// ```rust
    /// use varken::utils::url::UrlUtils;
    ///
    /// assert_eq!(UrlUtils::normalize_scheme("sonarr.lan:8989"), "https://sonarr.lan:8989");
    /// assert_eq!(UrlUtils::normalize_scheme("http://sonarr.lan"), "http://sonarr.lan");
    /// ```
    pub fn normalize_scheme(url: &str) -> String {
        let trimmed = url.trim().trim_end_matches('/');

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        }
    }

    /// Parse a configured address into a base URL ending in `/`
    pub fn parse_base(url: &str) -> AppResult<Url> {
        let normalized = format!("{}/", Self::normalize_scheme(url));
        Url::parse(&normalized)
            .map_err(|e| AppError::configuration(format!("Invalid server url '{url}': {e}")))
    }

    /// Replace secret query values with `****`
    pub fn obfuscate_credentials(url: &Url) -> String {
        let mut redacted = url.clone();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                if SENSITIVE_PARAMS.contains(&k.to_ascii_lowercase().as_str()) {
                    (k.into_owned(), "****".to_string())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();

        if pairs.is_empty() {
            return redacted.to_string();
        }
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
        redacted.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_scheme_trims_trailing_slash() {
        assert_eq!(
            UrlUtils::normalize_scheme(" radarr.lan/ "),
            "https://radarr.lan"
        );
    }

    #[test]
    fn test_parse_base_keeps_path_prefix() {
        let base = UrlUtils::parse_base("http://media.lan/sonarr").unwrap();
        assert_eq!(base.join("api/v3/queue").unwrap().as_str(), "http://media.lan/sonarr/api/v3/queue");
    }

    #[test]
    fn test_parse_base_rejects_garbage() {
        assert!(UrlUtils::parse_base("http://").is_err());
    }

    #[test]
    fn test_obfuscate_credentials() {
        let url = Url::parse("https://tautulli.lan/api/v2?apikey=secret&cmd=get_activity").unwrap();
        let shown = UrlUtils::obfuscate_credentials(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("cmd=get_activity"));
    }
}
