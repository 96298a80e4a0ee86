use serde::{Deserialize, Serialize};

// MARK: - Resolution

/// Output resolution requested from the capture handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const VGA: Self = Self { width: 640, height: 480 };
    pub const HD: Self = Self { width: 1280, height: 720 };
    pub const FHD: Self = Self { width: 1920, height: 1080 };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// MARK: - LivestreamState

/// Whether the periodic livestream task is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivestreamState {
    #[default]
    Stopped,
    Running,
}

impl LivestreamState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for LivestreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

// MARK: - Frame

/// A raw frame pulled from the capture handle.
///
/// Rows are tightly packed: `data.len() == step() * height`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: bytes::Bytes,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Presentation timestamp reported by the backend (µs).
    pub timestamp_us: u64,
}

impl Frame {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Bytes per row.
    pub fn step(&self) -> u32 {
        self.width * self.format.bytes_per_pixel()
    }

    /// True when the buffer length matches the declared geometry.
    pub fn is_consistent(&self) -> bool {
        self.data.len() as u64 == self.step() as u64 * self.height as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 3 bytes per pixel: Blue, Green, Red.
    Bgr8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::Bgr8 => 3,
        }
    }

    /// Encoding label carried on published image messages.
    pub fn encoding(&self) -> &'static str {
        match self {
            Self::Bgr8 => "bgr8",
        }
    }
}
