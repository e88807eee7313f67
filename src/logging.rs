//! Subscriber setup for the `modweave` binary.

use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `filter`, which is the `[logging]`
/// filter of the config file, and `info` is used when neither is set.
/// Setting `NO_COLOR` disables colored output.
pub fn init_logging(filter: Option<&str>) {
    let env_filter = match (std::env::var("RUST_LOG").is_ok(), filter) {
        (true, _) => EnvFilter::from_default_env(),
        (false, Some(filter)) => EnvFilter::new(filter),
        (false, None) => EnvFilter::new("info"),
    };

    // stdout carries the reports
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter)
        .init();
}
