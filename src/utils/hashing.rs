//! Deterministic identity hashes
//!
//! Dashboards join rows across polls on a per-item hash, so the same server,
//! title and label must always produce the same digest regardless of the
//! order items arrived in.

use std::fmt::Display;

/// md5 hex digest over the concatenation of `server_id`, `title` and `label`
///
/// ```rust
/// use varken::utils::hashing::identity_hash;
///
/// let a = identity_hash(&1, "Slow Horses", "S02E03");
/// let b = identity_hash(&1, "Slow Horses", "S02E03");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 32);
/// ```
pub fn identity_hash(server_id: &dyn Display, title: &str, label: &str) -> String {
    let composed = format!("{server_id}{title}{label}");
    format!("{:x}", md5::compute(composed.as_bytes()))
}
