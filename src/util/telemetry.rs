//! Tracing bootstrap for binaries and tests.

use tracing_subscriber::EnvFilter;

/// Install a default subscriber unless the application already set one.
///
/// The filter comes from `RUST_LOG`, falling back to `minion_pool=info` so
/// pool lifecycle events are visible out of the box. Worker thread names
/// (`pool-worker-N`) are included in every event, which is usually the first
/// thing needed when reading interleaved dispatch logs. Library code only
/// emits events; it never forces a subscriber on an embedding application.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("minion_pool=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
