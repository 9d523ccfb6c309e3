//! Diagnostics setup.
//!
//! Library events go to stderr so stdout stays clean for reports and
//! `--json` output. `RUST_LOG` takes precedence over `--verbose`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn default_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

pub fn init(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbose)
            .compact(),
    );
    // A subscriber may already be installed when embedded in tests.
    let _ = subscriber.try_init();
}
