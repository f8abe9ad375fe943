use tracing_subscriber::EnvFilter;

/// Initialise logging. The default level is `info`; `debug_logging` in the
/// overlay settings raises it to `debug`.
pub fn init(debug: bool) {
    // Without debug logging we force `info` regardless of `RUST_LOG`, so a
    // stray variable in the user's environment cannot flood the hook thread.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        // `RUST_LOG` may refine the level once debug logging is on.
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
