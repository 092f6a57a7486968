//! Process-wide logging setup
//!
//! Tracklab emits structured events through [`tracing`]. The subscriber is
//! configured exactly once at process startup; library code never touches
//! global logging state beyond the dispatcher installed here.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Respects `RUST_LOG` for filtering and defaults to `info` when unset.
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init so embedding applications (and tests) keep their own subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
