//! `CaptureController` — arbitrates livestream and snapshot capture on one camera.
//!
//! # State machine
//!
//! ```text
//!            trigger(true) / set livestream res, start PeriodicTask
//!   Stopped ─────────────────────────────────────────────────────► Running
//!      ▲                                                              │
//!      └──────────────────── trigger(false) / drop PeriodicTask ─────┘
//!
//!   Running --trigger(true)--> Running    (no second task)
//!   Stopped --trigger(false)-> Stopped    (no-op)
//! ```
//!
//! A snapshot is not a state: it runs to completion inside one call
//! (snapshot res → read → persist → publish → count → evict → livestream res).
//!
//! The periodic task is an `Option`, and `LivestreamState` is derived from it,
//! so there is never more than one task and stopping never needs a live handle.

use std::path::PathBuf;
use std::time::Duration;

use camsnap_bus::Publisher;
use camsnap_capture::CaptureDevice;
use camsnap_core::{CamSnapError, Frame, LivestreamState, Resolution, Settings};
use tracing::{debug, error, info, warn};

use crate::delivery::FrameDelivery;
use crate::periodic::PeriodicTask;
use crate::retention::RetentionWindow;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Output resolution for each mode; fixed for the lifetime of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeResolutions {
    pub livestream: Resolution,
    pub snapshot:   Resolution,
}

impl From<&Settings> for ModeResolutions {
    fn from(settings: &Settings) -> Self {
        Self {
            livestream: settings.livestream.resolution,
            snapshot:   settings.snapshot.resolution,
        }
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivestreamTransition {
    Started,
    Stopped,
    AlreadyRunning,
    AlreadyStopped,
    /// Start refused; state unchanged.
    DeviceUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Captured {
        sequence: u64,
        path:     PathBuf,
        /// File that fell out of the retention window, if one was deleted.
        evicted:  Option<PathBuf>,
    },
    /// `false` on the snapshot trigger.
    Ignored,
    DeviceUnavailable,
    ReadFailed,
    PersistFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Published,
    Skipped,
    /// No livestream running.
    Idle,
}

// ── CaptureController ─────────────────────────────────────────────────────────

pub struct CaptureController<D, P> {
    device:           D,
    delivery:         FrameDelivery<P>,
    retention:        RetentionWindow,
    modes:            ModeResolutions,
    period:           Duration,
    livestream:       Option<PeriodicTask>,
    snapshot_counter: u64,
}

impl<D: CaptureDevice, P: Publisher> CaptureController<D, P> {
    /// Take ownership of an opened device and leave it livestream-ready.
    pub fn new(
        mut device: D,
        delivery: FrameDelivery<P>,
        retention: RetentionWindow,
        modes: ModeResolutions,
        period: Duration,
    ) -> Self {
        device.set_resolution(modes.livestream);
        Self {
            device,
            delivery,
            retention,
            modes,
            period,
            livestream: None,
            snapshot_counter: 0,
        }
    }

    /// Start numbering snapshots at `counter` instead of 0.
    pub fn with_initial_counter(mut self, counter: u64) -> Self {
        self.snapshot_counter = counter;
        self
    }

    pub fn livestream_state(&self) -> LivestreamState {
        if self.livestream.is_some() {
            LivestreamState::Running
        } else {
            LivestreamState::Stopped
        }
    }

    /// Sequence number the next snapshot will get.
    pub fn snapshot_counter(&self) -> u64 {
        self.snapshot_counter
    }

    // ── Livestream ────────────────────────────────────────────────────────────

    /// Handle a message on the livestream-state topic.
    pub fn on_livestream_state(&mut self, start: bool) -> LivestreamTransition {
        debug!("livestream state message: {}", start);
        if start {
            self.start_livestream()
        } else {
            self.stop_livestream()
        }
    }

    fn start_livestream(&mut self) -> LivestreamTransition {
        if self.livestream.is_some() {
            debug!("livestream already running");
            return LivestreamTransition::AlreadyRunning;
        }
        if !self.device.is_available() {
            info!("camera not available — livestream not started");
            return LivestreamTransition::DeviceUnavailable;
        }
        self.device.set_resolution(self.modes.livestream);
        self.livestream = Some(PeriodicTask::start(self.period));
        info!("starting livestream at {} every {:?}", self.modes.livestream, self.period);
        LivestreamTransition::Started
    }

    fn stop_livestream(&mut self) -> LivestreamTransition {
        match self.livestream.take() {
            Some(_task) => {
                info!("stopping livestream");
                LivestreamTransition::Stopped
            }
            None => {
                debug!("can't stop livestream because livestream is already stopped");
                LivestreamTransition::AlreadyStopped
            }
        }
    }

    /// Resolve on the next livestream tick; never resolves while stopped.
    pub async fn next_tick(&mut self) {
        match self.livestream.as_mut() {
            Some(task) => task.tick().await,
            None => std::future::pending().await,
        }
    }

    /// One livestream tick: pull a frame and publish it. No retries.
    pub fn on_tick(&mut self) -> TickOutcome {
        if self.livestream.is_none() {
            return TickOutcome::Idle;
        }
        let frame = match self.device.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                debug!("livestream frame skipped: {}", e);
                return TickOutcome::Skipped;
            }
        };
        match self.delivery.livestream(&frame) {
            Ok(()) => TickOutcome::Published,
            Err(e) => {
                warn!("livestream publish failed: {}", e);
                TickOutcome::Skipped
            }
        }
    }

    // ── Snapshot ──────────────────────────────────────────────────────────────

    /// Handle a message on the snapshot-trigger topic.
    ///
    /// The device is switched back to the livestream resolution afterwards,
    /// whether or not the capture succeeded and whether or not livestream is running.
    pub fn on_snapshot_trigger(&mut self, capture: bool) -> SnapshotOutcome {
        if !capture {
            debug!("snapshot trigger false — ignored");
            return SnapshotOutcome::Ignored;
        }
        info!("snapshot requested (sequence {})", self.snapshot_counter);

        self.device.set_resolution(self.modes.snapshot);
        let outcome = if self.device.is_available() {
            self.capture_snapshot()
        } else {
            info!("camera not available — snapshot skipped");
            SnapshotOutcome::DeviceUnavailable
        };
        self.device.set_resolution(self.modes.livestream);
        outcome
    }

    fn capture_snapshot(&mut self) -> SnapshotOutcome {
        let sequence = self.snapshot_counter;
        let (frame, path) = match self.read_and_persist(sequence) {
            Ok(saved) => saved,
            Err(CamSnapError::Capture(e)) => {
                warn!("snapshot read failed: {}", e);
                return SnapshotOutcome::ReadFailed;
            }
            Err(e) => {
                error!("snapshot {} not saved: {}", sequence, e);
                return SnapshotOutcome::PersistFailed;
            }
        };
        info!("image saved at {} ({})", path.display(), frame.resolution());

        if let Err(e) = self.delivery.snapshot(&frame, sequence) {
            warn!("snapshot {} publish failed: {}", sequence, e);
        }

        self.snapshot_counter += 1;
        let evicted = self.retention.evict(self.snapshot_counter);
        SnapshotOutcome::Captured { sequence, path, evicted }
    }

    fn read_and_persist(&mut self, sequence: u64) -> Result<(Frame, PathBuf), CamSnapError> {
        let frame = self.device.read_frame()?;
        let path = self.retention.persist(sequence, &frame)?;
        Ok((frame, path))
    }
}
