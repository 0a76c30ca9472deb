//! Logging setup shared by the binaries.

use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize the fmt subscriber. `RUST_LOG` is honoured; the crate logs at
/// `info`, or `debug` when `verbose` is set.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let directive = if verbose {
        "discord_purge=debug"
    } else {
        "discord_purge=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_target(false)
        .init();

    Ok(())
}

/// Log a failed command at error level and hand the result back unchanged.
pub fn log_failure<T>(command: &str, result: anyhow::Result<T>) -> anyhow::Result<T> {
    if let Err(err) = &result {
        error!(command, "{:#}", err);
    }
    result
}
