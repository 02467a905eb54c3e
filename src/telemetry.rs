//! Telemetry
//!
//! Structured logging for sweep and resolution runs. Quiet by default so
//! CLI output stays clean; set `RUST_LOG` (or pass `--verbose`) to see
//! per-quiz and per-student detail.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. Only enables output when
/// `RUST_LOG` is explicitly set.
pub fn init_tracing() {
    if let Ok(filter) = std::env::var("RUST_LOG") {
        init_tracing_with_filter(&filter);
    }
}

/// Initialize tracing at `info` for verbose mode.
pub fn init_tracing_verbose() {
    init_tracing_with_filter("info")
}

/// Initialize with a custom filter string. Safe to call more than once.
pub fn init_tracing_with_filter(filter: &str) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .with_level(true)
            .compact()
            .with_writer(std::io::stderr);

        let filter_layer = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .try_init();
    });
}
