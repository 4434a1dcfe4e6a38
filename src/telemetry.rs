use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// JSON logs to stderr, filtered by `RUST_LOG` (default `info`).
///
/// stdout is left for command output so results can be piped.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,loadcast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();
}
