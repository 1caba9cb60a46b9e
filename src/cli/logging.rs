//! Tracing initialization for the command-line binary

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter directives
pub const LOG_ENV: &str = "QCAST_LOG";

static INIT: Once = Once::new();

/// Initialize logging from `QCAST_LOG` (e.g. `QCAST_LOG=qcast=debug`)
///
/// Falls back to `qcast=warn`. Events are written to stderr so stdout
/// stays machine-readable. Calling it more than once is a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("qcast=warn"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .with(filter)
            .init();
    });
}
