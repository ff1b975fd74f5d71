//! Tracing setup for the binary.
//!
//! `GATECHECK_LOG` takes an `EnvFilter` directive (for example
//! `GATECHECK_LOG=gatecheck::executor=debug`). Without it the level follows
//! the `-v` count. Output goes to stderr so reports on stdout stay parseable.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV_VAR: &str = "GATECHECK_LOG";

static INIT: Once = Once::new();

/// Level directive for a `-v` count
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(verbose: u8) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(format!("gatecheck={}", level_for_verbosity(verbose))));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbose >= 2),
            )
            .with(filter)
            .init();
    });
}
