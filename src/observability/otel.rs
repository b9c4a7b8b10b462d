//! OpenTelemetry span export.
//!
//! With an endpoint configured, installs an OTLP (gRPC) batch exporter as the
//! global tracer provider and bridges `tracing` spans into it. Without one,
//! only console logging is set up and spans created through
//! [`OtelSink::global`](crate::sink::OtelSink::global) go to the no-op provider.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Config, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::tracing::{env_filter, fmt_layer};
use crate::config::TraceConfig;
use crate::error::Result;

/// Shuts the global tracer provider down when dropped, flushing pending spans.
#[derive(Debug)]
#[must_use = "dropping the guard shuts span export down"]
pub struct TelemetryGuard {
    exporting: bool,
}

impl TelemetryGuard {
    pub fn is_exporting(&self) -> bool {
        self.exporting
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.exporting {
            global::shutdown_tracer_provider();
        }
    }
}

/// Initialize logging and, if `otel_endpoint` is set, OTLP span export.
///
/// Must run inside a Tokio runtime when exporting: the batch exporter spawns
/// its worker on it.
pub fn init_telemetry(config: &TraceConfig) -> Result<TelemetryGuard> {
    let filter = env_filter(&config.log_level)?;

    let Some(endpoint) = config.otel_endpoint.as_deref() else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer(config.log_format))
            .try_init()?;
        info!("Telemetry initialized (OTLP disabled, console only)");
        return Ok(TelemetryGuard { exporting: false });
    };

    let provider = build_provider(endpoint, &config.service_name)?;
    let tracer = provider.tracer(config.tracer_name.clone());
    global::set_tracer_provider(provider);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(config.log_format))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;

    info!(
        endpoint,
        service = %config.service_name,
        tracer = %config.tracer_name,
        "Telemetry initialized with OTLP export"
    );
    Ok(TelemetryGuard { exporting: true })
}

fn build_provider(endpoint: &str, service_name: &str) -> Result<TracerProvider> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        service_name.to_string(),
    )]);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(Config::default().with_resource(resource))
        .install_batch(runtime::Tokio)?;
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_without_export_does_not_shut_down() {
        let guard = TelemetryGuard { exporting: false };
        assert!(!guard.is_exporting());
        drop(guard);
    }
}
