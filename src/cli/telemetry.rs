//! Log subscriber and optional OTLP trace export.
//!
//! Export is enabled only when `OTEL_EXPORTER_OTLP_ENDPOINT` is set; otherwise
//! the node logs to stdout and nothing else.

use anyhow::{Context, Result, anyhow};
use base64::{Engine, engine::general_purpose};
use once_cell::sync::OnceCell;
use opentelemetry::{
    KeyValue, global, propagation::TextMapCompositePropagator, trace::TracerProvider as _,
};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::{env::var, time::Duration};
use tonic::metadata::{Ascii, Binary, MetadataKey, MetadataMap, MetadataValue};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const ENV_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
const ENV_INSTANCE_ID: &str = "OTEL_SERVICE_INSTANCE_ID";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// `k1=v1,k2=v2` pairs; entries without `=` or with an empty key are skipped.
fn parse_headers(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

/// gRPC metadata from header pairs; `-bin` keys carry base64 values.
fn metadata(headers: &[(String, String)]) -> Result<MetadataMap> {
    let mut map = MetadataMap::with_capacity(headers.len());

    for (key, value) in headers {
        if key.ends_with("-bin") {
            let bytes = general_purpose::STANDARD
                .decode(value.as_bytes())
                .map_err(|e| anyhow!("failed to base64-decode value for key {key}: {e}"))?;
            let name = MetadataKey::<Binary>::from_bytes(key.as_bytes())
                .map_err(|e| anyhow!("invalid binary metadata key {key}: {e}"))?;
            map.insert_bin(name, MetadataValue::from_bytes(&bytes));
        } else {
            let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
                .map_err(|e| anyhow!("invalid metadata key {key}: {e}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|e| anyhow!("invalid metadata value for key {key}: {e}"))?;
            map.insert(name, value);
        }
    }

    Ok(map)
}

// Collectors usually sit next to the node, so a bare host:port is plain http.
fn collector_endpoint(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

fn init_tracer(endpoint: &str) -> Result<Tracer> {
    let endpoint = collector_endpoint(endpoint);

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT);

    if let Ok(raw) = var(ENV_HEADERS) {
        let headers = parse_headers(&raw);
        if !headers.is_empty() {
            builder = builder.with_metadata(metadata(&headers)?);
        }
    }

    let exporter = builder.build().context("failed to build OTLP span exporter")?;

    let instance_id = var(ENV_INSTANCE_ID).unwrap_or_else(|_| Ulid::new().to_string());

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder_empty()
                .with_attributes([
                    KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    KeyValue::new("service.instance.id", instance_id),
                ])
                .build(),
        )
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    debug!(endpoint = %endpoint, "OTLP trace export enabled");

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `verbosity_level`, which defaults to `ERROR`.
///
/// # Errors
///
/// Returns an error if the exporter or the subscriber cannot be installed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.unwrap_or(Level::ERROR).into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    match var(ENV_ENDPOINT) {
        Ok(endpoint) if !endpoint.trim().is_empty() => {
            let tracer = init_tracer(&endpoint)?;
            let subscriber = Registry::default()
                .with(fmt_layer)
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        _ => {
            let subscriber = Registry::default().with(fmt_layer).with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

/// Flush and stop the tracer provider; a no-op when export is disabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(err) = provider.shutdown()
    {
        debug!("tracer provider shutdown failed: {err}");
    }
}
