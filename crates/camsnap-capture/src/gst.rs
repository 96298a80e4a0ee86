//! GStreamer-backed capture handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::{Bytes, BytesMut};
use camsnap_core::config::DeviceConfig;
use camsnap_core::{CaptureError, Frame, PixelFormat, Resolution};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use tracing::{debug, error, info, trace, warn};

use crate::pipeline::{pipeline_description, SCALE_ELEMENT, SINK_ELEMENT};
use crate::CaptureDevice;

/// How long one pull may wait for the pipeline to produce a frame.
const SAMPLE_TIMEOUT: gstreamer::ClockTime = gstreamer::ClockTime::from_seconds(2);

/// Frames at the previous resolution tolerated after a caps change (~1 s at 30 fps).
const MAX_STALE_SAMPLES: usize = 30;

// ── GstCamera ─────────────────────────────────────────────────────────────────

/// Camera handle backed by a GStreamer pipeline ending in an appsink.
///
/// Opened once; dropping it sets the pipeline to `Null` and releases the device.
pub struct GstCamera {
    pipeline:   gstreamer::Pipeline,
    scale:      gstreamer::Element,
    appsink:    AppSink,
    resolution: Resolution,
    /// Cleared by the bus watcher on `Error` / `EOS`.
    healthy:    Arc<AtomicBool>,
    stop:       Arc<AtomicBool>,
    bus_watcher: Option<JoinHandle<()>>,
}

impl GstCamera {
    /// Build and start the capture pipeline with `initial` as output resolution.
    pub fn open(device: &DeviceConfig, initial: Resolution) -> Result<Self, CaptureError> {
        gstreamer::init().map_err(|e| CaptureError::Pipeline(format!("GStreamer init: {e}")))?;

        let desc = pipeline_description(device, initial);
        debug!("Camera pipeline: {}", desc);

        let pipeline = gstreamer::parse::launch(&desc)
            .map_err(|e| CaptureError::Pipeline(format!("parsing pipeline: {e}")))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| CaptureError::Pipeline("expected a Pipeline".into()))?;

        let scale = pipeline
            .by_name(SCALE_ELEMENT)
            .ok_or_else(|| CaptureError::Pipeline(format!("no element '{SCALE_ELEMENT}'")))?;

        let appsink = pipeline
            .by_name(SINK_ELEMENT)
            .and_then(|element| element.downcast::<AppSink>().ok())
            .ok_or_else(|| CaptureError::Pipeline(format!("no appsink '{SINK_ELEMENT}'")))?;

        let bus = pipeline
            .bus()
            .ok_or_else(|| CaptureError::Pipeline("pipeline has no bus".into()))?;

        let healthy = Arc::new(AtomicBool::new(true));
        let stop = Arc::new(AtomicBool::new(false));
        let bus_watcher = spawn_bus_watcher(bus, Arc::clone(&healthy), Arc::clone(&stop))?;

        let mut camera = Self {
            pipeline,
            scale,
            appsink,
            resolution: initial,
            healthy,
            stop,
            bus_watcher: Some(bus_watcher),
        };
        camera.start()?;

        info!("Camera open: {} @ {} fps, output {}", device.source, device.framerate, initial);
        Ok(camera)
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.pipeline.set_state(gstreamer::State::Playing).map_err(|_| {
            self.healthy.store(false, Ordering::Relaxed);
            CaptureError::DeviceUnavailable
        })?;

        // Wait for the async state change so a missing sensor fails here, not on first read.
        let (result, _, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(5));
        if result.is_err() {
            self.healthy.store(false, Ordering::Relaxed);
            return Err(CaptureError::DeviceUnavailable);
        }
        Ok(())
    }
}

impl CaptureDevice for GstCamera {
    fn set_resolution(&mut self, resolution: Resolution) {
        if resolution == self.resolution {
            return;
        }
        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", "BGR")
            .field("width", resolution.width as i32)
            .field("height", resolution.height as i32)
            .build();
        self.scale.set_property("caps", &caps);
        debug!("Camera output {} → {}", self.resolution, resolution);
        self.resolution = resolution;
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn is_available(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        if !self.is_available() {
            return Err(CaptureError::DeviceUnavailable);
        }

        // The appsink may still hold frames negotiated before the last caps change.
        let expected = self.resolution();
        let appsink = &self.appsink;
        let (sample, info) = pull_matching(expected, MAX_STALE_SAMPLES, || {
            let Some(sample) = appsink.try_pull_sample(SAMPLE_TIMEOUT) else {
                return Ok(None);
            };
            let caps = sample.caps().ok_or_else(|| read_failed("sample without caps"))?;
            let info = gstreamer_video::VideoInfo::from_caps(caps).map_err(read_failed)?;
            Ok(Some((Resolution::new(info.width(), info.height()), (sample, info))))
        })?;
        let buffer = sample.buffer().ok_or_else(|| read_failed("sample without buffer"))?;
        let timestamp_us = buffer.pts().map(|t| t.useconds()).unwrap_or(0);
        let map = buffer.map_readable().map_err(read_failed)?;

        let width = info.width();
        let height = info.height();
        let row_bytes = (width * PixelFormat::Bgr8.bytes_per_pixel()) as usize;
        let stride = info.stride().first().copied().unwrap_or(0).max(0) as usize;

        let data = pack_rows(map.as_slice(), row_bytes, stride, height as usize)
            .ok_or_else(|| read_failed(format!("short buffer for {width}x{height} (stride {stride})")))?;

        Ok(Frame { data, width, height, format: PixelFormat::Bgr8, timestamp_us })
    }
}

impl Drop for GstCamera {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.pipeline.set_state(gstreamer::State::Null);
        if let Some(handle) = self.bus_watcher.take() {
            let _ = handle.join();
        }
        debug!("Camera closed");
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn read_failed(reason: impl ToString) -> CaptureError {
    CaptureError::ReadFailed { reason: reason.to_string() }
}

/// Pull samples from `next` until one arrives at `expected`, discarding stale ones.
///
/// `next` yields `Ok(None)` when nothing arrived in time (timeout or EOS).
fn pull_matching<S>(
    expected: Resolution,
    max_stale: usize,
    mut next: impl FnMut() -> Result<Option<(Resolution, S)>, CaptureError>,
) -> Result<S, CaptureError> {
    let mut stale = 0;
    loop {
        match next()? {
            Some((actual, sample)) if actual == expected => return Ok(sample),
            Some((actual, _)) => {
                stale += 1;
                trace!("Dropping {} sample while waiting for {}", actual, expected);
                if stale > max_stale {
                    return Err(read_failed(format!("no {expected} frame after {stale} samples")));
                }
            }
            None => return Err(read_failed(format!("timed out waiting for a {expected} frame"))),
        }
    }
}

/// Watch the pipeline bus on a dedicated thread; clears `healthy` on error or EOS.
fn spawn_bus_watcher(
    bus: gstreamer::Bus,
    healthy: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, CaptureError> {
    std::thread::Builder::new()
        .name("camsnap-gst-bus".into())
        .spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let Some(msg) = bus.timed_pop(gstreamer::ClockTime::from_mseconds(250)) else {
                    continue; // poll timeout
                };
                match msg.view() {
                    gstreamer::MessageView::Eos(_) => {
                        warn!("Camera pipeline EOS");
                        healthy.store(false, Ordering::Relaxed);
                        break;
                    }
                    gstreamer::MessageView::Error(e) => {
                        error!("Camera pipeline error: {} ({:?})", e.error(), e.debug());
                        healthy.store(false, Ordering::Relaxed);
                        break;
                    }
                    _ => {}
                }
            }
        })
        .map_err(|e| CaptureError::Pipeline(format!("spawning bus watcher: {e}")))
}

/// Copy `rows` rows of `row_bytes` out of a buffer laid out with `stride`,
/// dropping any row padding. `None` when the buffer is too short.
fn pack_rows(src: &[u8], row_bytes: usize, stride: usize, rows: usize) -> Option<Bytes> {
    if rows == 0 || row_bytes == 0 || stride < row_bytes {
        return None;
    }
    if src.len() < stride * (rows - 1) + row_bytes {
        return None;
    }
    if stride == row_bytes {
        return Some(Bytes::copy_from_slice(&src[..row_bytes * rows]));
    }
    let mut out = BytesMut::with_capacity(row_bytes * rows);
    for row in src.chunks(stride).take(rows) {
        out.extend_from_slice(&row[..row_bytes]);
    }
    Some(out.freeze())
}
