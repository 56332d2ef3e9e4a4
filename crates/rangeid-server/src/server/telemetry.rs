//! # Telemetry Features
//!
//! Console logging through `tracing-subscriber` is always on. OpenTelemetry
//! export is optional.
//!
//! ## Feature matrix
//!
//! - `otel`: Enables OpenTelemetry distributed tracing (via spans).
//! - `metrics`: Enables OpenTelemetry metrics (via counters and histograms).
//! - `stdout`: Enables the stdout exporter.
//!
//! ## Feature constraints
//!
//! - `stdout` requires at least one of `otel` or `metrics`.
//!
//! ## Span behavior
//!
//! - Every request runs inside an `info` span carrying its trace id
//! - Events inside a span become span events in telemetry backends
//! - Events outside of a span are only shown in log output
//!
//! ## Example usage
//!
//! ```bash
//! cargo run --features otel,metrics,stdout
//! ```

#[cfg(all(feature = "stdout", not(any(feature = "otel", feature = "metrics"))))]
compile_error!("The 'stdout' feature requires at least one of 'otel' or 'metrics' to be enabled.");

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "otel")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "otel")]
use opentelemetry_sdk::trace as sdktrace;

use crate::server::config::LogFormat;

const SERVICE_NAME: &str = "rangeid-server";

pub struct TelemetryProviders {
    #[cfg(feature = "otel")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

pub fn init_telemetry(log_format: LogFormat) -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "otel")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "otel")]
    let tracer_provider = init_tracer();

    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics();

    #[cfg(any(feature = "metrics", feature = "otel"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    let fmt_layer = match log_format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_thread_ids(true)
            .with_line_number(true)
            .with_target(false)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
            .with_file(true)
            .pretty()
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
            .json()
            .with_current_span(true)
            .boxed(),
    };

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt_layer);

    #[cfg(feature = "otel")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "otel")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

impl TelemetryProviders {
    /// Flushes pending spans and metrics, then shuts the exporters down.
    pub fn shutdown(self) {
        #[cfg(feature = "otel")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

#[cfg(any(feature = "metrics", feature = "otel"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    builder.build()
}

#[cfg(feature = "otel")]
fn init_tracer() -> sdktrace::SdkTracerProvider {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::SpanExporter;
        let exporter = SpanExporter::default();
        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();
        builder.with_span_processor(batch)
    };

    builder.build()
}

#[cfg(feature = "metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static IDS_ISSUED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static BAD_REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static GENERATION_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static REQUEST_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Total tracking number requests")
            .build(),
    );

    let _ = IDS_ISSUED.set(
        meter
            .u64_counter("ids_issued")
            .with_description("Tracking numbers issued")
            .build(),
    );

    let _ = BAD_REQUESTS.set(
        meter
            .u64_counter("bad_requests")
            .with_description("Requests rejected by validation")
            .build(),
    );

    let _ = GENERATION_ERRORS.set(
        meter
            .u64_counter("generation_errors")
            .with_description("Requests that failed to obtain a tracking number")
            .build(),
    );

    let _ = REQUEST_DURATION_MS.set(
        meter
            .f64_histogram("request_duration")
            .with_unit("ms")
            .with_description("End-to-end request duration")
            .build(),
    );
}

// Convenience functions that compile to no-ops when metrics are disabled
#[cfg(feature = "metrics")]
pub fn increment_requests() {
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_requests() {}

#[cfg(feature = "metrics")]
pub fn increment_ids_issued() {
    if let Some(counter) = IDS_ISSUED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_ids_issued() {}

#[cfg(feature = "metrics")]
pub fn increment_bad_requests() {
    if let Some(counter) = BAD_REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_bad_requests() {}

#[cfg(feature = "metrics")]
pub fn increment_generation_errors() {
    if let Some(counter) = GENERATION_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_generation_errors() {}

#[cfg(feature = "metrics")]
pub fn record_request_duration(duration_ms: f64) {
    if let Some(histogram) = REQUEST_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_request_duration(_duration_ms: f64) {}
