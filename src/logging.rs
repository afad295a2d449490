//! Logging initialization for the command line tool.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a stderr subscriber.
///
/// `RUST_LOG` takes precedence, then `filter`, then `info`. ANSI colors are
/// disabled when `NO_COLOR` is set. Calling this twice is a no-op.
pub fn init_logging(filter: Option<&str>) {
    let env_filter = match (std::env::var("RUST_LOG"), filter) {
        (Ok(_), _) => EnvFilter::from_default_env(),
        (Err(_), Some(filter)) => EnvFilter::new(filter),
        (Err(_), None) => EnvFilter::new("info"),
    };

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(std::env::var_os("NO_COLOR").is_none()),
        )
        .with(env_filter)
        .try_init();
}
