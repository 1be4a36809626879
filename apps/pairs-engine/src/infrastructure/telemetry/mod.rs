//! Tracing Setup
//!
//! One `tracing-subscriber` registry: an `EnvFilter`, a fmt layer, and an
//! OpenTelemetry layer exporting spans over OTLP/gRPC when enabled.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `pairs_engine=info,tungstenite=warn`)
//! - `OTEL_ENABLED`: set to "true" to export spans (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP gRPC endpoint (default: http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: service name for traces (default: pairs-engine)

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "pairs_engine=info,tungstenite=warn";

const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

const DEFAULT_SERVICE_NAME: &str = "pairs-engine";

// =============================================================================
// Configuration
// =============================================================================

/// Where spans are exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtlpTarget {
    /// OTLP gRPC endpoint.
    pub endpoint: String,
    /// `service.name` resource attribute.
    pub service_name: String,
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Fallback filter directives.
    pub default_filter: String,
    /// Span export target; `None` keeps logging local.
    pub otlp: Option<OtlpTarget>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            otlp: None,
        }
    }
}

impl TelemetryConfig {
    /// Configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let enabled =
            non_empty("OTEL_ENABLED").is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let otlp = enabled.then(|| OtlpTarget {
            endpoint: non_empty("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string()),
            service_name: non_empty("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
        });

        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            otlp,
        }
    }
}

// =============================================================================
// Installation
// =============================================================================

/// Flushes pending spans when dropped. Hold it for the life of `main`.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are being exported.
    #[must_use]
    pub const fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Span exporter shutdown failed: {e}");
        }
    }
}

/// Install the global subscriber from the environment.
#[must_use]
pub fn init() -> TelemetryGuard {
    init_with_config(&TelemetryConfig::from_env())
}

/// Install the global subscriber.
///
/// An OTLP exporter that cannot be built only disables span export; logging
/// still comes up.
#[must_use]
pub fn init_with_config(config: &TelemetryConfig) -> TelemetryGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let export = config
        .otlp
        .as_ref()
        .and_then(|target| build_provider(target).map(|p| (p, target.service_name.clone())));

    let otel_layer = export.as_ref().map(|(provider, service_name)| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(otel_layer)
        .init();

    TelemetryGuard {
        provider: export.map(|(provider, _)| provider),
    }
}

fn build_provider(target: &OtlpTarget) -> Option<SdkTracerProvider> {
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(target.endpoint.clone())
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!(
                "OTLP exporter for {} unavailable, span export disabled: {e}",
                target.endpoint
            );
            return None;
        }
    };

    let resource = Resource::builder()
        .with_service_name(target.service_name.clone())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn export_is_off_unless_enabled() {
        assert_eq!(TelemetryConfig::from_lookup(lookup(&[])), TelemetryConfig::default());
        let config = TelemetryConfig::from_lookup(lookup(&[("OTEL_ENABLED", "yes")]));
        assert!(config.otlp.is_none());
    }

    #[test]
    fn enabled_export_uses_defaults_for_blank_values() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("OTEL_ENABLED", " TRUE "),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", ""),
            ("OTEL_SERVICE_NAME", "pairs-lab"),
        ]));
        let target = config.otlp.unwrap();
        assert_eq!(target.endpoint, DEFAULT_OTLP_ENDPOINT);
        assert_eq!(target.service_name, "pairs-lab");
    }

    #[test]
    fn default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }
}
