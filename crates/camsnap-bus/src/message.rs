//! Wire types exchanged with the pub/sub layer.

use bytes::Bytes;
use camsnap_core::Frame;
use serde::{Deserialize, Serialize};

// ── Inbound ───────────────────────────────────────────────────────────────────

/// A boolean message received on a trigger topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub topic: String,
    pub data:  bool,
}

impl Trigger {
    pub fn new(topic: impl Into<String>, data: bool) -> Self {
        Self { topic: topic.into(), data }
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Correlation id. Snapshots carry their sequence number; livestream frames leave it empty.
    pub frame_id: String,
    pub stamp_us: u64,
}

/// Raw image message, laid out like a ROS `sensor_msgs/Image`.
#[derive(Debug, Clone)]
pub struct ImageMessage {
    pub header:   Header,
    pub width:    u32,
    pub height:   u32,
    /// Pixel encoding label, e.g. `bgr8`.
    pub encoding: &'static str,
    /// Bytes per row.
    pub step:     u32,
    pub data:     Bytes,
}

impl ImageMessage {
    /// Wrap `frame` without copying pixel data.
    pub fn from_frame(frame: &Frame, sequence: Option<u64>) -> Self {
        Self {
            header: Header {
                frame_id: sequence.map(|s| s.to_string()).unwrap_or_default(),
                stamp_us: frame.timestamp_us,
            },
            width:    frame.width,
            height:   frame.height,
            encoding: frame.format.encoding(),
            step:     frame.step(),
            data:     frame.data.clone(),
        }
    }

    /// Sequence number parsed back out of `header.frame_id`.
    pub fn sequence(&self) -> Option<u64> {
        self.header.frame_id.parse().ok()
    }
}

/// An image message together with the topic it was published on.
#[derive(Debug, Clone)]
pub struct Publication {
    pub topic:   String,
    pub message: ImageMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camsnap_core::PixelFormat;

    fn frame() -> Frame {
        Frame {
            data: Bytes::from(vec![7u8; 2 * 2 * 3]),
            width: 2,
            height: 2,
            format: PixelFormat::Bgr8,
            timestamp_us: 42,
        }
    }

    #[test]
    fn snapshot_message_carries_sequence() {
        let msg = ImageMessage::from_frame(&frame(), Some(12));
        assert_eq!(msg.header.frame_id, "12");
        assert_eq!(msg.sequence(), Some(12));
        assert_eq!(msg.encoding, "bgr8");
        assert_eq!(msg.step, 6);
        assert_eq!(msg.header.stamp_us, 42);
        assert_eq!(msg.data.len(), 12);
    }

    #[test]
    fn livestream_message_has_no_sequence() {
        let msg = ImageMessage::from_frame(&frame(), None);
        assert!(msg.header.frame_id.is_empty());
        assert_eq!(msg.sequence(), None);
    }

    #[test]
    fn trigger_json_shape() {
        let trigger: Trigger =
            serde_json::from_str(r#"{"topic": "/camera0/snapshot/trigger", "data": true}"#).unwrap();
        assert_eq!(trigger, Trigger::new("/camera0/snapshot/trigger", true));
    }
}
