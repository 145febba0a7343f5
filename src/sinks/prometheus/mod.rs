//! Pull sink: a gauge registry served at `/metrics`
//!
//! Every field of every point becomes one gauge named
//! `{prefix}_{measurement}_{field}` after sanitising. The label names of a
//! gauge are frozen to the sorted tag keys of the first point that produced
//! it. After each batch, every label tuple the gauge has ever seen but that
//! was missing from the batch is reset to zero.

#[cfg(feature = "prometheus")]
mod exporter;
#[cfg(not(feature = "prometheus"))]
mod unavailable;

#[cfg(feature = "prometheus")]
pub use exporter::PrometheusExporter;
#[cfg(not(feature = "prometheus"))]
pub use unavailable::PrometheusExporter;

/// Lowercase, replace everything outside `[a-zA-Z0-9_]` with `_`, and
/// prefix `_` when the result would start with a digit.
///
/// ```rust
/// use varken::sinks::prometheus::sanitize;
///
/// assert_eq!(sanitize("Sonarr Queue!"), "sonarr_queue_");
/// assert_eq!(sanitize("4k_requests"), "_4k_requests");
/// ```
pub fn sanitize(raw: &str) -> String {
    let mut sanitized: String = raw
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Gauge name for one field of a measurement
pub fn metric_name(prefix: &str, measurement: &str, field: &str) -> String {
    let base = sanitize(&format!("{measurement}_{field}"));
    if prefix.is_empty() {
        base
    } else {
        format!("{prefix}_{base}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Sonarr Queue!", "sonarr_queue_")]
    #[case("Tautulli_stream_count", "tautulli_stream_count")]
    #[case("2160p", "_2160p")]
    #[case("Überseerr", "_berseerr")]
    #[case("", "")]
    fn test_sanitize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize(raw), expected);
    }

    #[test]
    fn test_metric_name_with_and_without_prefix() {
        assert_eq!(metric_name("varken", "Sonarr", "count"), "varken_sonarr_count");
        assert_eq!(metric_name("", "Sonarr", "count"), "sonarr_count");
        assert_eq!(metric_name("", "4K", "count"), "_4k_count");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(raw in ".*") {
            let once = sanitize(&raw);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn sanitize_never_starts_with_a_digit(raw in ".*") {
            let sanitized = sanitize(&raw);
            prop_assert!(!sanitized.starts_with(|c: char| c.is_ascii_digit()));
            prop_assert!(sanitized.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }
}
