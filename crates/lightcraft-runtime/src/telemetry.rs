//! Logging and trace-export initialisation for Lightcraft binaries.
//!
//! Call [`init_tracing`] once at process startup.  Logs go to stderr so they
//! never interleave with the operator console on stdout.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `LIGHTCRAFT_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL, e.g. `http://localhost:4318`. Enables span export over HTTP. |
//!
//! # Example
//!
//! ```rust,no_run
//! let _guard = lightcraft_runtime::telemetry::init_tracing("lightcraft");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var selecting the log line format.
pub const LOG_FORMAT_ENV: &str = "LIGHTCRAFT_LOG_FORMAT";

/// Install the global `tracing` subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.  Hold the returned guard until the process exits so buffered spans
/// are flushed.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let provider = build_provider(service_name);
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("lightcraft")));

    let (json_layer, compact_layer) = if json_requested() {
        (
            Some(fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(fmt::layer().compact().with_writer(std::io::stderr)),
        )
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(otel_layer)
        .with(json_layer)
        .with(compact_layer)
        .try_init();
    if let Err(e) = installed {
        eprintln!("[lightcraft] tracing subscriber already installed: {e}");
    }

    TracerProviderGuard(provider)
}

/// Shuts the OTel [`SdkTracerProvider`] down on drop, flushing pending spans.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    pub fn exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(Err(e)) = self.0.take().map(|p| p.shutdown()) {
            eprintln!("[lightcraft] OpenTelemetry provider shutdown error: {e}");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn json_requested() -> bool {
    parse_format(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
}

fn parse_format(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("json"))
}

fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[lightcraft] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Simple exporter: the relay has no async runtime to host a batch worker.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}
