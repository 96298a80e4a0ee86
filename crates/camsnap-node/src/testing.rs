//! Scripted capture device and controller fixture for unit tests.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use camsnap_bus::{ChannelPublisher, Publication};
use camsnap_capture::CaptureDevice;
use camsnap_core::{CaptureError, Frame, PixelFormat, Resolution};
use tempfile::TempDir;
use tokio::sync::mpsc;

use crate::controller::{CaptureController, ModeResolutions};
use crate::delivery::FrameDelivery;
use crate::retention::RetentionWindow;

pub const LIVESTREAM: Resolution = Resolution { width: 8, height: 6 };
pub const SNAPSHOT: Resolution = Resolution { width: 16, height: 12 };
pub const PERIOD: Duration = Duration::from_millis(30);
pub const LIVESTREAM_TOPIC: &str = "/camera0/livestream";
pub const SNAPSHOT_TOPIC: &str = "/camera0/snapshot";

#[derive(Debug)]
pub struct CameraState {
    pub available:   bool,
    pub fail_reads:  bool,
    pub resolution:  Resolution,
    /// Every resolution passed to `set_resolution`, in order.
    pub history:     Vec<Resolution>,
    pub reads:       u32,
    /// Resolution in effect for each successful read.
    pub read_resolutions: Vec<Resolution>,
}

/// Fake camera whose state stays inspectable after the controller takes ownership.
#[derive(Debug, Clone)]
pub struct FakeCamera {
    state: Arc<Mutex<CameraState>>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CameraState {
                available: true,
                fail_reads: false,
                resolution: LIVESTREAM,
                history: Vec::new(),
                reads: 0,
                read_resolutions: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, CameraState> {
        self.state.lock().unwrap()
    }

    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }
}

impl Default for FakeCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for FakeCamera {
    fn set_resolution(&mut self, resolution: Resolution) {
        let mut state = self.state();
        state.resolution = resolution;
        state.history.push(resolution);
    }

    fn resolution(&self) -> Resolution {
        self.state().resolution
    }

    fn is_available(&self) -> bool {
        self.state().available
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let mut state = self.state();
        state.reads += 1;
        if !state.available {
            return Err(CaptureError::DeviceUnavailable);
        }
        if state.fail_reads {
            return Err(CaptureError::ReadFailed { reason: "no data".into() });
        }
        let current = state.resolution;
        state.read_resolutions.push(current);
        let Resolution { width, height } = current;
        let data = vec![state.reads as u8; (width * height * 3) as usize];
        Ok(Frame {
            data: Bytes::from(data),
            width,
            height,
            format: PixelFormat::Bgr8,
            timestamp_us: u64::from(state.reads) * 1_000,
        })
    }
}

pub struct Fixture {
    pub controller:   CaptureController<FakeCamera, ChannelPublisher>,
    pub camera:       FakeCamera,
    pub publications: mpsc::UnboundedReceiver<Publication>,
    pub dir:          TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let camera = FakeCamera::default();
        let (publisher, publications) = ChannelPublisher::new();
        let delivery = FrameDelivery::new(publisher, LIVESTREAM_TOPIC, SNAPSHOT_TOPIC);
        let retention = RetentionWindow::open(dir.path(), 5, 90).unwrap();
        let controller = CaptureController::new(
            camera.clone(),
            delivery,
            retention,
            ModeResolutions { livestream: LIVESTREAM, snapshot: SNAPSHOT },
            PERIOD,
        );
        Self { controller, camera, publications, dir }
    }

    /// Drain everything published so far.
    pub fn published(&mut self) -> Vec<Publication> {
        let mut out = Vec::new();
        while let Ok(p) = self.publications.try_recv() {
            out.push(p);
        }
        out
    }

    /// Snapshot indices currently on disk, sorted.
    pub fn files_on_disk(&self) -> Vec<u64> {
        let mut indices: Vec<u64> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_prefix("image")?.strip_suffix(".jpg")?.parse().ok()
            })
            .collect();
        indices.sort_unstable();
        indices
    }
}
