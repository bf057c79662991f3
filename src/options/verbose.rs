use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `--verbose` turns on debug output for this
/// crate; otherwise `RUST_LOG` applies, defaulting to warnings only.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(format!("{}=debug,warn", env!("CARGO_CRATE_NAME")))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}
