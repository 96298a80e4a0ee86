//! GStreamer pipeline description for the capture handle.

use camsnap_core::config::DeviceConfig;
use camsnap_core::Resolution;

/// Name of the capsfilter whose caps select the output resolution.
pub(crate) const SCALE_ELEMENT: &str = "scale";
/// Name of the appsink frames are pulled from.
pub(crate) const SINK_ELEMENT: &str = "sink";

/// Build the `gst-launch` style description for `device`, scaled to `output`.
///
/// With `nvmm` the sensor caps live in NVMM memory and `nvvidconv` copies them
/// to system memory as BGRx before the regular conversion chain.
pub fn pipeline_description(device: &DeviceConfig, output: Resolution) -> String {
    let sensor = device.sensor;
    let fps = device.framerate;

    let head = if device.nvmm {
        format!(
            "{src} \
             ! video/x-raw(memory:NVMM),width=(int){w},height=(int){h},format=(string)NV12,framerate=(fraction){fps}/1 \
             ! nvvidconv \
             ! video/x-raw,format=(string)BGRx \
             ! videoconvert",
            src = device.source,
            w = sensor.width,
            h = sensor.height,
        )
    } else {
        format!(
            "{src} \
             ! video/x-raw,width=(int){w},height=(int){h},framerate=(fraction){fps}/1 \
             ! videoconvert",
            src = device.source,
            w = sensor.width,
            h = sensor.height,
        )
    };

    format!(
        "{head} \
         ! videoscale \
         ! capsfilter name={SCALE_ELEMENT} caps=\"{caps}\" \
         ! appsink name={SINK_ELEMENT} max-buffers=1 drop=true sync=false emit-signals=false",
        caps = output_caps(output),
    )
}

/// Caps string for the scaled BGR output.
pub(crate) fn output_caps(output: Resolution) -> String {
    format!(
        "video/x-raw,format=(string)BGR,width=(int){},height=(int){}",
        output.width, output.height
    )
}
