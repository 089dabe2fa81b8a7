//! Subscriber setup.

use super::exporter::file_tracer_provider;
use crate::Config;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_sdk::resource::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG` when set, else `config.trace_level`, else
/// `info`. Events go to stderr. When `config.trace_file` is set, spans are
/// also exported there as OTLP JSON lines.
///
/// Safe to call more than once; only the first call installs anything.
///
/// ```rust
/// use event_compass::{observability::init_tracing, Config};
///
/// init_tracing(&Config::default());
/// tracing::debug!("tracing is now active");
/// ```
pub fn init_tracing(config: &Config) {
    let level = config.trace_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let otel_layer = config.trace_file.as_ref().map(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let resource = Resource::new(vec![
            KeyValue::new("service.name", "event-compass"),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ]);
        let provider = file_tracer_provider(path.clone(), resource);
        OpenTelemetryLayer::new(provider.tracer("event-compass"))
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init();
}
