//! Tracing subscriber setup.
//!
//! Diagnostics go to stderr so stdout stays clean for the briefing text.
//! The filter is read from `HAWKEYE_LOG` (same syntax as `RUST_LOG`).

use std::sync::Once;

use tracing_subscriber::EnvFilter;

const FILTER_VAR: &str = "HAWKEYE_LOG";
const DEFAULT_FILTER: &str = "hawkeye=info";

static INIT: Once = Once::new();

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(FILTER_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        // A subscriber installed by an embedding program wins.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
