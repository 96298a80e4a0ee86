pub mod config;
pub mod errors;
pub mod types;

pub use config::{Settings, Topics};
pub use errors::{CamSnapError, CaptureError, ConfigError, StorageError};
pub use types::*;
