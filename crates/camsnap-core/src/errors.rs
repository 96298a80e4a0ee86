use thiserror::Error;

#[derive(Error, Debug)]
pub enum CamSnapError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture device unavailable")]
    DeviceUnavailable,

    #[error("Failed to read frame: {reason}")]
    ReadFailed { reason: String },

    #[error("GStreamer pipeline error: {0}")]
    Pipeline(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode snapshot: {reason}")]
    Encode { reason: String },

    #[error("Frame buffer does not match {width}x{height}")]
    FrameSize { width: u32, height: u32 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration invalid: {reason}")]
    Invalid { reason: String },
}
