//! Diagnostic logging for the `recipe` binary.
//!
//! The library only emits `tracing` events; this module installs the
//! subscriber that prints them. Output goes to stderr so that search
//! results on stdout stay machine-readable.
//!
//! `RUST_LOG` takes precedence over the level passed in:
//! ```bash
//! RUST_LOG=debug recipe search "domates"
//! RUST_LOG=recipe_agent::indexer=info recipe build
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Level used when neither `RUST_LOG` nor `--verbose` is given.
pub const DEFAULT_LEVEL: &str = "warn";

static INIT: Once = Once::new();

/// HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Install the stderr subscriber. Only the first call takes effect.
pub fn init(level: &str) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(level)
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Map the CLI's `-v` count to a filter directive.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => DEFAULT_LEVEL,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
