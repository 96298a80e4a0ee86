//! Rolling on-disk window of snapshot images.
//!
//! Files are named `image{N}.jpg` where `N` is the snapshot sequence number.
//! The window never scans its directory: the sequence counter alone says which
//! file falls out of the window after each capture.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use camsnap_core::{Frame, StorageError};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::{debug, warn};

pub struct RetentionWindow {
    dir:      PathBuf,
    capacity: u64,
    quality:  u8,
}

impl RetentionWindow {
    /// Use `dir` for snapshots (created if missing), keeping at most `capacity` files.
    pub fn open(dir: impl Into<PathBuf>, capacity: u64, quality: u8) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!("Snapshot directory {} (keep {})", dir.display(), capacity);
        Ok(Self { dir, capacity: capacity.max(1), quality })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("image{index}.jpg"))
    }

    /// Encode `frame` (BGR) as JPEG and write it as `image{index}.jpg`.
    pub fn persist(&self, index: u64, frame: &Frame) -> Result<PathBuf, StorageError> {
        let size_err = || StorageError::FrameSize { width: frame.width, height: frame.height };
        if !frame.is_consistent() {
            return Err(size_err());
        }

        let mut rgb = frame.data.to_vec();
        for px in rgb.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        let image = RgbImage::from_raw(frame.width, frame.height, rgb).ok_or_else(size_err)?;

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&image)
            .map_err(|e| StorageError::Encode { reason: e.to_string() })?;

        let path = self.path_for(index);
        fs::write(&path, &jpeg)?;
        Ok(path)
    }

    /// Drop the file that left the window now that `count` snapshots exist.
    ///
    /// With `count` images written (indices `0..count`) the window holds the
    /// last `capacity` of them, so `image{count - capacity - 1}` is removed.
    /// Returns the path only when a file was actually deleted.
    pub fn evict(&self, count: u64) -> Option<PathBuf> {
        if count <= self.capacity {
            return None;
        }
        let path = self.path_for(count - self.capacity - 1);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Evicted {}", path.display());
                Some(path)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Could not evict {}: {}", path.display(), e);
                None
            }
        }
    }
}
