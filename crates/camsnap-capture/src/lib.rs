//! camsnap-capture — the single camera handle shared by livestream and snapshot mode.
//!
//! # Backends
//!
//! | Backend | Source | Notes |
//! |---------|--------|-------|
//! | [`GstCamera`] | `nvarguscamerasrc` (Jetson CSI), `v4l2src`, `videotestsrc` | GStreamer appsink |
//! | [`UnavailableCamera`] | none | stands in when the device failed to open |
//!
//! # Usage
//!
//! ```rust,no_run
//! use camsnap_capture::{CaptureDevice, GstCamera};
//! use camsnap_core::{config::DeviceConfig, Resolution};
//!
//! # fn example() -> Result<(), camsnap_core::CaptureError> {
//! let mut camera = GstCamera::open(&DeviceConfig::default(), Resolution::VGA)?;
//! camera.set_resolution(Resolution::FHD);
//! let frame = camera.read_frame()?;
//! // frame.data: tightly packed BGR rows, frame.step() bytes each
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! <source> ──► (nvvidconv) ──► videoconvert ──► videoscale
//!                                                   │
//!                                  capsfilter name=scale  ◄── set_resolution()
//!                                                   │
//!                                               appsink  ──► read_frame() (blocking pull)
//! ```

mod gst;
mod pipeline;

pub use gst::GstCamera;
pub use pipeline::pipeline_description;

use camsnap_core::{CaptureError, Frame, Resolution};
use tracing::debug;

// ── CaptureDevice ─────────────────────────────────────────────────────────────

/// The capture handle contract.
///
/// All calls are synchronous; [`read_frame`](CaptureDevice::read_frame) may
/// block until the backend produces data.
pub trait CaptureDevice {
    /// Request a new output resolution. Best effort: nothing is reported back.
    fn set_resolution(&mut self, resolution: Resolution);

    /// Resolution most recently requested with `set_resolution`.
    fn resolution(&self) -> Resolution;

    /// True while the device is open and has not failed.
    fn is_available(&self) -> bool;

    /// Pull the next frame.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;
}

// ── UnavailableCamera ─────────────────────────────────────────────────────────

/// Placeholder handle for a device that could not be opened.
///
/// Keeps the node queryable: every operation reports the device as unavailable.
#[derive(Debug, Clone)]
pub struct UnavailableCamera {
    resolution: Resolution,
}

impl UnavailableCamera {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }
}

impl CaptureDevice for UnavailableCamera {
    fn set_resolution(&mut self, resolution: Resolution) {
        debug!("set_resolution({}) on unavailable camera", resolution);
        self.resolution = resolution;
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn is_available(&self) -> bool {
        false
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        Err(CaptureError::DeviceUnavailable)
    }
}

impl<D: CaptureDevice + ?Sized> CaptureDevice for Box<D> {
    fn set_resolution(&mut self, resolution: Resolution) {
        (**self).set_resolution(resolution)
    }

    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        (**self).read_frame()
    }
}
