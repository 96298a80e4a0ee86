use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;
use crate::types::Resolution;

/// Settings file used when neither a CLI argument nor `CAMSNAP_SETTINGS` is given.
pub const DEFAULT_SETTINGS_PATH: &str = "config/camsnap.json";

// MARK: - Settings

/// Node settings, read once at startup and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: DeviceConfig,
    pub livestream: LivestreamConfig,
    pub snapshot: SnapshotConfig,
    pub topics: TopicConfig,
    #[serde(alias = "triggerListenAddr")]
    pub trigger_listen_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            livestream: LivestreamConfig::default(),
            snapshot: SnapshotConfig::default(),
            topics: TopicConfig::default(),
            trigger_listen_addr: "127.0.0.1:7879".to_owned(),
        }
    }
}

/// Raw device pipeline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// GStreamer source element, with properties (e.g. `v4l2src device=/dev/video0`).
    pub source: String,
    /// Native sensor mode negotiated with the source.
    pub sensor: Resolution,
    pub framerate: u32,
    /// Source produces NVMM buffers that need `nvvidconv` (Jetson CSI cameras).
    pub nvmm: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            source: "nvarguscamerasrc".to_owned(),
            sensor: Resolution::FHD,
            framerate: 30,
            nvmm: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivestreamConfig {
    pub resolution: Resolution,
    /// Periodic task interval in milliseconds (30 ms ≈ 30 Hz).
    #[serde(alias = "periodMs")]
    pub period_ms: u64,
}

impl Default for LivestreamConfig {
    fn default() -> Self {
        Self { resolution: Resolution::VGA, period_ms: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub resolution: Resolution,
    #[serde(alias = "imageLocation")]
    pub image_location: PathBuf,
    /// Number of snapshot files kept on disk.
    #[serde(alias = "retentionCount")]
    pub retention_count: u64,
    #[serde(alias = "jpegQuality")]
    pub jpeg_quality: u8,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::FHD,
            image_location: PathBuf::from("images"),
            retention_count: 5,
            jpeg_quality: 95,
        }
    }
}

/// Topic name fragments. See [`Settings::topics`] for how they compose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub camera: String,
    #[serde(alias = "cameraId")]
    pub camera_id: String,
    pub livestream: String,
    #[serde(alias = "livestreamTrigger")]
    pub livestream_trigger: String,
    pub snapshot: String,
    #[serde(alias = "snapshotTrigger")]
    pub snapshot_trigger: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            camera: "/camera".to_owned(),
            camera_id: "0".to_owned(),
            livestream: "/livestream".to_owned(),
            livestream_trigger: "/state".to_owned(),
            snapshot: "/snapshot".to_owned(),
            snapshot_trigger: "/trigger".to_owned(),
        }
    }
}

// MARK: - Topics

/// The four fully composed topic names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub livestream_state: String,
    pub snapshot_trigger: String,
    pub livestream_image: String,
    pub snapshot_image: String,
}

impl Settings {
    /// Load and validate settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&raw)?;
        settings.validate()?;
        debug!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Settings path: first CLI argument, else `CAMSNAP_SETTINGS`, else the default.
    pub fn resolve_path(cli_arg: Option<String>) -> PathBuf {
        cli_arg
            .or_else(|| std::env::var("CAMSNAP_SETTINGS").ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| Err(ConfigError::Invalid { reason: reason.to_owned() });

        if self.device.source.trim().is_empty() {
            return invalid("device.source is empty");
        }
        if self.device.sensor.is_empty() {
            return invalid("device.sensor resolution must be non-zero");
        }
        if self.device.framerate == 0 {
            return invalid("device.framerate must be > 0");
        }
        if self.livestream.resolution.is_empty() {
            return invalid("livestream.resolution must be non-zero");
        }
        if self.livestream.period_ms == 0 {
            return invalid("livestream.period_ms must be > 0");
        }
        if self.snapshot.resolution.is_empty() {
            return invalid("snapshot.resolution must be non-zero");
        }
        if self.snapshot.image_location.as_os_str().is_empty() {
            return invalid("snapshot.image_location is empty");
        }
        if self.snapshot.retention_count == 0 {
            return invalid("snapshot.retention_count must be >= 1");
        }
        if !(1..=100).contains(&self.snapshot.jpeg_quality) {
            return invalid("snapshot.jpeg_quality must be within 1..=100");
        }
        Ok(())
    }

    /// Compose topic names: `camera + camera_id` is the base, inbound
    /// triggers append their fragment to the matching outbound topic.
    pub fn topics(&self) -> Topics {
        let t = &self.topics;
        let base = format!("{}{}", t.camera, t.camera_id);
        let livestream_image = format!("{base}{}", t.livestream);
        let snapshot_image = format!("{base}{}", t.snapshot);
        Topics {
            livestream_state: format!("{livestream_image}{}", t.livestream_trigger),
            snapshot_trigger: format!("{snapshot_image}{}", t.snapshot_trigger),
            livestream_image,
            snapshot_image,
        }
    }

    /// Interval between livestream ticks.
    pub fn livestream_period(&self) -> Duration {
        Duration::from_millis(self.livestream.period_ms)
    }
}
