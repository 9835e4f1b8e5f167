//! Structured logging setup.
//!
//! `-v`/`-q` select the `tracing` filter level the way `MikkoParkkola-mcp-gateway`
//! wires `tracing-subscriber`'s `EnvFilter` to its own verbosity flags.

use tracing_subscriber::EnvFilter;

pub fn init(verbose: u8, quiet: bool) {
    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
