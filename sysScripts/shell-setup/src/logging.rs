use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. Diagnostics go to stderr so they
/// never interleave with the progress lines printed on stdout.
/// `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
    let default_level = default_directive(verbose);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Filter used when `RUST_LOG` is unset. Step results already reach stdout,
/// so only warnings and errors are logged by default.
fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}
