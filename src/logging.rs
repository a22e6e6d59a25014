use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise default `asset_tracker` logging.
///
/// Logs at `INFO` unless `RUST_LOG` says otherwise. Output goes to stderr so
/// JSON written to stdout stays clean.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init()
}
