use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "ADVISORIES_LOG";

/// Installs the stderr subscriber; `ADVISORIES_LOG` holds the filter.
pub fn init_logger() {
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(EnvFilter::new(filter))
        .init();
}
