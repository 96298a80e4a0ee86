use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // RUST_LOG=debug for per-tick logging, GST_DEBUG=3 for GStreamer itself
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(false)
        .init();

    info!("camsnap node v{}", env!("CARGO_PKG_VERSION"));

    match app::run(std::env::args().nth(1)).await {
        Ok(()) => {
            info!("camsnap node exited cleanly.");
            Ok(())
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            Err(e)
        }
    }
}
