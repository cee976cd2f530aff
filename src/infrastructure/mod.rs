//! Infrastructure - cold path only
//!
//! Non-latency-critical code:
//! - HTTP API server
//! - Configuration management
//! - Logging and metrics

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{Config, ConfigError};
pub use metrics::{MetricsCollector, MetricsSnapshot};
