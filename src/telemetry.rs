//! Log output for binaries embedding the pipeline
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the host. [`init_tracing`] is the default for the demos and tests.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info,ledger_insight=debug"`).
///
/// Returns `false` if a global subscriber was already installed; calling it
/// twice is harmless.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
