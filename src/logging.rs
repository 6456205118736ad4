//! Progress log set-up.
//!
//! Lines go to standard output without target or level columns. The filter
//! honours `RUST_LOG` and falls back to `info`.

use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Timestamps are printed only when
/// `timestamps` is set. A second call is a no-op.
pub fn init(timestamps: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_level(false)
        .with_ansi(false);

    if timestamps {
        builder.try_init().ok();
    } else {
        builder.without_time().try_init().ok();
    }
}
