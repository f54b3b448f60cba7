use tracing_subscriber::EnvFilter;

/// Initialise logging for a tracker host. The default level is `info`;
/// passing `debug` raises it and lets `RUST_LOG` override the filter.
/// When debug logging is off the level is forced regardless of the
/// environment, so a stray `RUST_LOG` cannot flood a production overlay.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
