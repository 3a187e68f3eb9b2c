use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes tracing for the workflow engine.
///
/// Honors `RUST_LOG`; defaults to debug for this crate. Safe to call more
/// than once: subsequent calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "survey_flow=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
