//! Telemetry initialization and configuration

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INITIALIZED: OnceLock<()> = OnceLock::new();

const DEFAULT_FILTER: &str = "info";
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to install OTLP pipeline: {0}")]
    Otlp(#[from] opentelemetry::trace::TraceError),
}

/// Where telemetry goes for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// OTLP collector endpoint; console only when `None`.
    pub otlp_endpoint: Option<String>,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), otlp_endpoint: None }
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    /// Reads `OTEL_EXPORTER_OTLP_ENDPOINT` through `lookup`; blank values are ignored.
    pub fn from_env<F>(service_name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let otlp_endpoint =
            lookup(OTLP_ENDPOINT_ENV).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self { service_name: service_name.into(), otlp_endpoint }
    }
}

/// Initializes console logging, plus OTLP export when an endpoint is configured.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    match &config.otlp_endpoint {
        Some(endpoint) => init_with_otlp(&config.service_name, endpoint),
        None => init_telemetry(&config.service_name),
    }
}

fn env_filter() -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(DEFAULT_FILTER)?),
    }
}

/// Initialize console logging filtered by `RUST_LOG` (default `info`).
///
/// Calling it again after a successful initialization is a no-op.
pub fn init_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .try_init()?;
    let _ = INITIALIZED.set(());

    tracing::info!(service.name = service_name, "Telemetry initialized");
    Ok(())
}

/// Initialize console logging and export spans to an OTLP collector.
///
/// Must be called from within a Tokio runtime.
pub fn init_with_otlp(service_name: &str, endpoint: &str) -> Result<(), TelemetryError> {
    use opentelemetry_otlp::WithExportConfig;
    use tracing_opentelemetry::OpenTelemetryLayer;

    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
            opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                "service.name",
                service_name.to_string(),
            )]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(OpenTelemetryLayer::new(tracer))
        .try_init()?;
    let _ = INITIALIZED.set(());

    tracing::info!(
        service.name = service_name,
        otlp.endpoint = endpoint,
        "Telemetry initialized with OpenTelemetry"
    );
    Ok(())
}

/// Flush pending spans before exit.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| vars.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_config_from_env_without_endpoint() {
        let vars = HashMap::new();
        let config = TelemetryConfig::from_env("web3-agent", lookup(&vars));
        assert_eq!(config, TelemetryConfig::new("web3-agent"));
    }

    #[test]
    fn test_config_from_env_with_endpoint() {
        let vars = HashMap::from([(OTLP_ENDPOINT_ENV, " http://localhost:4317 ")]);
        let config = TelemetryConfig::from_env("web3-agent", lookup(&vars));
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://localhost:4317"));
    }

    #[test]
    fn test_config_blank_endpoint_ignored() {
        let vars = HashMap::from([(OTLP_ENDPOINT_ENV, "  ")]);
        let config = TelemetryConfig::from_env("web3-agent", lookup(&vars));
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_init_is_idempotent() {
        init_telemetry("test-service").unwrap();
        init_telemetry("test-service").unwrap();
        init(&TelemetryConfig::new("test-service")).unwrap();
    }
}
