//! Typed records for every polled API
//!
//! Field lists cover what the collectors read plus the commonly present
//! neighbours; anything else an API sends ends up in each record's `extra` map.

pub mod overseerr;
pub mod radarr;
pub mod record;
pub mod shared;
pub mod sonarr;
pub mod tautulli;

pub use overseerr::*;
pub use radarr::*;
pub use record::{Record, decode, decode_all, lenient};
pub use shared::*;
pub use sonarr::*;
pub use tautulli::*;
