//! Structured logging setup (§2 "ambient stack"), built on the teacher's
//! `tracing` + `tracing-subscriber` stack: an `EnvFilter` driven by
//! `RUST_LOG`, raised to `debug` when `DEBUG` is set (§6), writing
//! compact formatted lines to stdout.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber. Safe to call once per
/// process; a second call is a no-op (the underlying `set_global_default`
/// error is swallowed since tests may initialize more than once).
pub fn init(default_level: &str) {
    let level = if crate::config::Settings::debug_enabled() {
        "debug"
    } else {
        default_level
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
