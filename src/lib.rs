//! varken polls media-automation services and exports what it finds as
//! time-series metrics.
//!
//! Pollers in [`services`] turn API responses into [`points::MetricPoint`]s;
//! the [`scheduler`] runs each poller on its own interval and hands every
//! batch to the configured [`sinks`].

pub mod config;
pub mod errors;
pub mod points;
pub mod scheduler;
pub mod services;
pub mod sinks;
pub mod structures;
pub mod utils;

pub use config::Config;
pub use errors::{AppError, AppResult};
