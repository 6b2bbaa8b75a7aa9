use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filtering follows `RUST_LOG` and falls back to `info,frame_ring=debug`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,frame_ring=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}
