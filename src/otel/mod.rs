//! OpenTelemetry integration for smartsafe-gate
//!
//! This module provides observability through OpenTelemetry, including
//! tracing and admission metrics with optional export to OTLP endpoints.

use crate::config::{LoggingConfig, OtelConfig};
use crate::error::{AuthError, OtelError};
use crate::policy::AccessDecision;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter, MeterProvider as _},
    trace::TracerProvider as TracerProviderTrait,
    KeyValue,
};
use opentelemetry_sdk::{metrics::SdkMeterProvider, trace::TracerProvider, Resource};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// OpenTelemetry provider for smartsafe-gate
///
/// Manages tracing and metrics providers with OTLP export capability.
pub struct OtelProvider {
    tracer_provider: Option<TracerProvider>,
    meter_provider: SdkMeterProvider,
    config: OtelConfig,
}

impl OtelProvider {
    /// Create a new OtelProvider with the given configuration
    pub fn new(config: &OtelConfig) -> Result<Self, OtelError> {
        let resource = Resource::new(vec![KeyValue::new(
            "service.name",
            config.service_name.clone(),
        )]);

        let (tracer_provider, meter_provider) = if config.enabled {
            let endpoint = config.endpoint.as_ref().ok_or_else(|| {
                OtelError::Config("OTLP endpoint is required when enabled".into())
            })?;

            let tracer_provider = Self::init_tracer_provider(endpoint, &resource)?;
            let meter_provider = Self::init_meter_provider(endpoint, &resource)?;

            (Some(tracer_provider), meter_provider)
        } else {
            // No reader attached, so recorded values go nowhere
            let meter_provider = SdkMeterProvider::builder().with_resource(resource).build();
            (None, meter_provider)
        };

        if let Some(ref tp) = tracer_provider {
            global::set_tracer_provider(tp.clone());
        }

        Ok(Self {
            tracer_provider,
            meter_provider,
            config: config.clone(),
        })
    }

    fn init_tracer_provider(
        endpoint: &str,
        resource: &Resource,
    ) -> Result<TracerProvider, OtelError> {
        use opentelemetry_otlp::WithExportConfig;
        use opentelemetry_sdk::runtime;
        use opentelemetry_sdk::trace::{Config, Sampler};

        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(endpoint)
            .build_span_exporter()
            .map_err(|e| OtelError::TracerInit(e.to_string()))?;

        let trace_config = Config::default()
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(resource.clone());

        Ok(TracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_config(trace_config)
            .build())
    }

    fn init_meter_provider(
        endpoint: &str,
        resource: &Resource,
    ) -> Result<SdkMeterProvider, OtelError> {
        use opentelemetry_otlp::{MetricsExporterBuilder, WithExportConfig};
        use opentelemetry_sdk::metrics::reader::{
            DefaultAggregationSelector, DefaultTemporalitySelector,
        };
        use opentelemetry_sdk::{metrics::PeriodicReader, runtime};

        let exporter = MetricsExporterBuilder::from(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .build_metrics_exporter(
            Box::new(DefaultTemporalitySelector::new()),
            Box::new(DefaultAggregationSelector::new()),
        )
        .map_err(|e| OtelError::MeterInit(e.to_string()))?;

        let reader = PeriodicReader::builder(exporter, runtime::Tokio).build();

        Ok(SdkMeterProvider::builder()
            .with_resource(resource.clone())
            .with_reader(reader)
            .build())
    }

    /// Get a tracer from the provider
    pub fn tracer(&self, name: &'static str) -> opentelemetry_sdk::trace::Tracer {
        if let Some(ref tp) = self.tracer_provider {
            tp.tracer(name)
        } else {
            TracerProvider::builder().build().tracer(name)
        }
    }

    /// Get the meter for creating metrics
    pub fn meter(&self) -> Meter {
        self.meter_provider.meter(self.config.service_name.clone())
    }

    /// Check if OpenTelemetry is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Shutdown the OpenTelemetry providers gracefully
    pub fn shutdown(&self) -> Result<(), OtelError> {
        if let Err(e) = self.meter_provider.shutdown() {
            return Err(OtelError::Shutdown(format!(
                "Meter shutdown failed: {:?}",
                e
            )));
        }

        if let Some(ref tp) = self.tracer_provider {
            for result in tp.force_flush() {
                if let Err(e) = result {
                    return Err(OtelError::Shutdown(format!("Tracer flush failed: {:?}", e)));
                }
            }
        }

        Ok(())
    }
}

impl Drop for OtelProvider {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Admission metrics for smartsafe-gate
pub struct Metrics {
    /// Admission decisions, labelled by decision
    pub admissions_total: Counter<u64>,

    /// Authentication failures, labelled by reason
    pub auth_failures_total: Counter<u64>,

    /// Time spent in the authentication gate in seconds
    pub auth_duration: Histogram<f64>,
}

impl Metrics {
    /// Create new metrics with the given meter
    pub fn new(meter: &Meter) -> Self {
        let admissions_total = meter
            .u64_counter("smartsafe_admissions_total")
            .with_description("Total number of admission decisions")
            .init();

        let auth_failures_total = meter
            .u64_counter("smartsafe_auth_failures_total")
            .with_description("Total number of failed authentications")
            .init();

        let auth_duration = meter
            .f64_histogram("smartsafe_auth_duration_seconds")
            .with_description("Authentication duration in seconds")
            .init();

        Self {
            admissions_total,
            auth_failures_total,
            auth_duration,
        }
    }

    /// Record an admission decision
    pub fn record_admission(&self, decision: AccessDecision) {
        self.admissions_total
            .add(1, &[KeyValue::new("decision", decision.as_str())]);
    }

    /// Record an authentication failure
    pub fn record_auth_failure(&self, error: &AuthError) {
        self.auth_failures_total
            .add(1, &[KeyValue::new("reason", error.reason())]);
    }

    /// Record how long the gate took
    pub fn record_auth_duration(&self, outcome: &str, duration_secs: f64) {
        self.auth_duration.record(
            duration_secs,
            &[KeyValue::new("outcome", outcome.to_string())],
        );
    }
}

fn parse_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize tracing subscriber with OpenTelemetry integration
pub fn init_tracing(otel: &OtelProvider, logging: &LoggingConfig) -> Result<(), OtelError> {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(parse_level(&logging.level));

    let otel_layer = otel
        .is_enabled()
        .then(|| tracing_opentelemetry::layer().with_tracer(otel.tracer("smartsafe-gate")));

    let pretty = logging.format.eq_ignore_ascii_case("pretty");
    let pretty_layer = pretty.then(|| tracing_subscriber::fmt::layer().pretty());
    let json_layer = (!pretty).then(|| tracing_subscriber::fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .map_err(|e| OtelError::TracerInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_config() -> OtelConfig {
        OtelConfig {
            enabled: false,
            endpoint: None,
            service_name: "test-service".to_string(),
        }
    }

    // Test 1: OtelProvider initialization with disabled config
    #[test]
    fn test_otel_provider_disabled() {
        let provider = OtelProvider::new(&disabled_config()).unwrap();

        assert!(!provider.is_enabled());
        assert!(provider.tracer_provider.is_none());
    }

    // Test 2: OtelProvider requires endpoint when enabled
    #[test]
    fn test_otel_provider_requires_endpoint_when_enabled() {
        let config = OtelConfig {
            enabled: true,
            ..disabled_config()
        };

        match OtelProvider::new(&config) {
            Err(OtelError::Config(msg)) => {
                assert!(msg.contains("endpoint is required"));
            }
            _ => panic!("Expected OtelError::Config"),
        }
    }

    // Test 3: Metrics record without an exporter
    #[test]
    fn test_metrics_record() {
        let provider = OtelProvider::new(&OtelConfig::default()).unwrap();
        let metrics = Metrics::new(&provider.meter());

        metrics.record_admission(AccessDecision::Allowed);
        metrics.record_admission(AccessDecision::Denied);
        metrics.record_admission(AccessDecision::RedirectToSecureChannel);
        metrics.record_auth_failure(&AuthError::InvalidCredential);
        metrics.record_auth_failure(&AuthError::DirectoryUnavailable);
        metrics.record_auth_duration("success", 0.012);
    }

    // Test 4: Provider shutdown
    #[test]
    fn test_otel_provider_shutdown() {
        let provider = OtelProvider::new(&disabled_config()).unwrap();
        assert!(provider.shutdown().is_ok());
    }

    // Test 5: Log level parsing falls back to info
    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    // Test 6: Default OtelConfig
    #[test]
    fn test_default_otel_config() {
        let config = OtelConfig::default();

        assert!(!config.enabled);
        assert!(config.endpoint.is_none());
        assert_eq!(config.service_name, "smartsafe-gate");
    }
}
