use std::io;

use anyhow::{Context, Result};
use camsnap_bus::{ChannelPublisher, Publication, TriggerListener};
use camsnap_capture::{CaptureDevice, GstCamera, UnavailableCamera};
use camsnap_core::{ConfigError, Settings};
use camsnap_node::{dispatch, CaptureController, FrameDelivery, ModeResolutions, RetentionWindow, TriggerRoutes};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Node lifecycle
///
/// 1. Load settings (missing file → defaults)
/// 2. Open the camera; on failure keep running with an unavailable device
/// 3. Bind the trigger listener
/// 4. Dispatch triggers and livestream ticks until Ctrl-C
/// 5. Drop the controller, which releases the camera
pub async fn run(settings_arg: Option<String>) -> Result<()> {
    // ── Settings ───────────────────────────────────────────────────────────
    let path = Settings::resolve_path(settings_arg);
    let settings = match Settings::load(&path) {
        Ok(settings) => settings,
        Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            warn!("No settings at {} — using defaults", path.display());
            Settings::default()
        }
        Err(e) => return Err(e).with_context(|| format!("loading {}", path.display())),
    };
    let topics = settings.topics();
    let modes = ModeResolutions::from(&settings);

    // ── Camera ─────────────────────────────────────────────────────────────
    let device: Box<dyn CaptureDevice> = match GstCamera::open(&settings.device, modes.livestream) {
        Ok(camera) => {
            info!("Camera opened: {} ({} @ {} fps)", settings.device.source, settings.device.sensor, settings.device.framerate);
            Box::new(camera)
        }
        Err(e) => {
            warn!("Camera not available: {} — triggers will be refused", e);
            Box::new(UnavailableCamera::new(modes.livestream))
        }
    };

    // ── Storage + delivery ─────────────────────────────────────────────────
    let retention = RetentionWindow::open(
        &settings.snapshot.image_location,
        settings.snapshot.retention_count,
        settings.snapshot.jpeg_quality,
    )
    .with_context(|| format!("opening {}", settings.snapshot.image_location.display()))?;
    info!("Snapshots → {} (keep {})", retention.dir().display(), retention.capacity());

    let (publisher, publications) = ChannelPublisher::new();
    tokio::spawn(log_publications(publications));
    let delivery = FrameDelivery::from_topics(publisher, &topics);

    let mut controller = CaptureController::new(device, delivery, retention, modes, settings.livestream_period());

    // ── Trigger ingress ────────────────────────────────────────────────────
    let listener = TriggerListener::bind(&settings.trigger_listen_addr)
        .await
        .with_context(|| format!("binding {}", settings.trigger_listen_addr))?;
    let (trigger_tx, trigger_rx) = mpsc::channel(32);
    let listener_task = listener.spawn(trigger_tx);

    // ── Dispatch until Ctrl-C ──────────────────────────────────────────────
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };
    dispatch::run(&mut controller, &TriggerRoutes::from(&topics), trigger_rx, shutdown).await;

    listener_task.abort();
    info!("Snapshots taken this session: {}", controller.snapshot_counter());
    drop(controller);
    Ok(())
}

/// Stand-in for the pub/sub layer: report what would have gone out.
async fn log_publications(mut rx: mpsc::UnboundedReceiver<Publication>) {
    while let Some(Publication { topic, message }) = rx.recv().await {
        match message.sequence() {
            Some(seq) => info!(
                "Published snapshot {} on {} ({}x{}, {} bytes)",
                seq, topic, message.width, message.height, message.data.len()
            ),
            None => debug!(
                "Published frame on {} ({}x{}, {} bytes)",
                topic, message.width, message.height, message.data.len()
            ),
        }
    }
}
