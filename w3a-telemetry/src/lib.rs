//! # w3a-telemetry
//!
//! Structured logging and distributed tracing for the Web3 agent.
//!
//! ```no_run
//! use w3a_telemetry::{TelemetryConfig, info};
//!
//! let config = TelemetryConfig::from_env("web3-agent", |key| std::env::var(key).ok());
//! w3a_telemetry::init(&config).expect("telemetry");
//! info!("ready");
//! ```

pub mod init;
pub mod spans;

pub use tracing::{Instrument, Span, debug, error, info, instrument, trace, warn};

pub use init::{
    TelemetryConfig, TelemetryError, init, init_telemetry, init_with_otlp, shutdown_telemetry,
};
pub use spans::*;
