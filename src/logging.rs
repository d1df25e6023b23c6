use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "METHODMINE_LOG";

/// Structured logs on stderr, filtered by `METHODMINE_LOG` (default `info`, `warn` when quiet).
pub fn init(quiet: bool) {
    let fallback = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    // keep an already installed subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
