//! Common utilities shared across all services.
//!
//! This crate provides:
//! - Unified error handling with an HTTP mapping
//! - Failure propagation for guarded operations
//! - Configuration structures and environment parsing

pub mod config;
pub mod error;
pub mod handler;

pub use config::*;
pub use error::{AppError, AppResult, ErrorKind, OptionExt};
pub use handler::{error_channel, guard, ChannelSink, ErrorSink, Guarded, Handled, IntoOutcome};
