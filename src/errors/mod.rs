//! Centralized error handling for varken
//!
//! # Error Categories
//!
//! - **Decode Errors**: one API response item did not fit its schema; the item
//!   is logged and dropped, the rest of the batch continues
//! - **Source Errors**: the external API call failed; the collection cycle is
//!   abandoned and nothing is emitted
//! - **Sink Errors**: a metrics backend write or registration failed; logged
//!   and dropped, never surfaced to the pollers
//! - **Configuration Errors**: the only errors allowed to stop the daemon, and
//!   only at start-up

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;

/// Convenience type alias for Sink Results
pub type SinkResult<T> = Result<T, SinkError>;
