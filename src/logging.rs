use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber for the engine's `tracing` events.
///
/// Defaults to `info`; override with `EPISODE_SYNC_LOG` (any `EnvFilter`
/// directive, e.g. `episode_sync::progress=debug`). Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_env_var("EPISODE_SYNC_LOG")
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}
