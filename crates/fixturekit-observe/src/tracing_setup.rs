//! Subscriber initialization for test runs.
//!
//! # Usage
//!
//! ```no_run
//! // Once per test binary, e.g. from a suite set-up hook
//! fixturekit_observe::tracing_setup::init_tracing(false).unwrap();
//!
//! // Inside a unit test; safe to call from every test
//! fixturekit_observe::tracing_setup::init_test_tracing();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Default filter when `RUST_LOG` is unset. Targets are the crate paths.
const DEFAULT_FILTER: &str = "fixturekit_core=info,fixturekit_infra=info,fixturekit_observe=info";

const TRACER_NAME: &str = "fixturekit";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn stdout_provider() -> SdkTracerProvider {
    SdkTracerProvider::builder()
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .build()
}

/// The layered subscriber: `filter`, a `fmt` layer with targets and span
/// close timing, and an OpenTelemetry layer when `provider` is given.
fn build_subscriber(filter: EnvFilter, provider: Option<&SdkTracerProvider>) -> impl Subscriber + Send + Sync + 'static {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);
    let otel_layer = provider.map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
}

/// Install the global subscriber, filtered by `RUST_LOG`.
///
/// With `enable_otel`, spans are also exported through OpenTelemetry to
/// stdout, which is handy for inspecting the nesting of builder creations.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let provider = enable_otel.then(stdout_provider);
    build_subscriber(env_filter(), provider.as_ref()).try_init()?;

    if let Some(provider) = provider {
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
    }

    tracing::debug!(otel = enable_otel, "tracing initialized");
    Ok(())
}

/// Install a subscriber writing through the test harness, so output is
/// captured per test. Later calls are no-ops.
pub fn init_test_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_test_writer()
            .try_init();
    });
}

/// Flush and shut down the OpenTelemetry provider, if one was installed.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
        tracing::info!("still logging");
    }

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        let subscriber = build_subscriber(EnvFilter::new(DEFAULT_FILTER), None);
        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "fixturekit_core::context", tracing::Level::INFO));
            assert!(tracing::enabled!(target: "fixturekit_infra::package", tracing::Level::INFO));
            assert!(!tracing::enabled!(target: "fixturekit_infra::package", tracing::Level::DEBUG));
        });
    }

    #[test]
    fn test_spans_are_exported_through_opentelemetry() {
        let provider = stdout_provider();
        let subscriber = build_subscriber(EnvFilter::new("debug"), Some(&provider));
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("create", builder = "PackageBuilder");
            span.in_scope(|| tracing::info!("python package created"));
        });
        assert!(provider.force_flush().is_ok());
        assert!(provider.shutdown().is_ok());
    }

    #[test]
    fn test_shutdown_without_otel_is_noop() {
        shutdown_tracing();
    }
}
