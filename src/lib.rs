//! Two-leg spread detection over a shared-memory quote bus
//!
//! An external producer publishes the latest quote for each instrument into
//! a fixed-size shared-memory region. This crate reads those regions, detects
//! spread opportunities per configured spread id, records opened positions in
//! a durable ledger, projects live P&L, and submits confirmed entries to a
//! remote order gateway.

pub mod core;
pub mod engine;
pub mod gateway;
pub mod infrastructure;
pub mod ledger;
pub mod pnl;
pub mod shm;
pub mod spread;

// Re-export commonly used types
pub use infrastructure::config::{ApiConfig, Config, EngineConfig, GatewayConfig};

use thiserror::Error;

/// Main error type for the spread engine
#[derive(Error, Debug)]
pub enum SpreadError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] gateway::GatewayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SpreadError>;
