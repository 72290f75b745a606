//! Log output for the `vgrab` binary.
//!
//! The library only emits `tracing` events:
//!
//! | Level | Emitted for |
//! |-------|-------------|
//! | INFO  | conversions |
//! | DEBUG | committed actions, forwarded transfers |
//! | WARN  | rejected actions |
//!
//! Fields: `operation`, `signer`, `owner`, `quantity`, `height`, `error`.
//! Conversions (`operation = "convert"`) also carry the paid-out `symbol`
//! and `amount`, plus the refunded `surplus` in source units.

use tracing_subscriber::EnvFilter;

/// Installs a stderr fmt subscriber. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
