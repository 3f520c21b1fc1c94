use std::path::Path;

use crate::capture::domain::camera::{Camera, CameraInfo};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Presents a still image as a camera that yields the same frame
/// `repeat` times.
pub struct ImageFileCamera {
    frame: Option<Frame>,
    remaining: u64,
    info: CameraInfo,
}

impl ImageFileCamera {
    pub fn open(path: &Path, repeat: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let img = image::open(path)
            .map_err(|e| format!("Failed to open image {}: {e}", path.display()))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        Ok(Self::from_frame(
            Frame::new(img.into_raw(), width, height, 3, 0),
            repeat,
            &path.display().to_string(),
        ))
    }

    pub fn from_frame(frame: Frame, repeat: u64, source: &str) -> Self {
        Self {
            info: CameraInfo {
                width: frame.width(),
                height: frame.height(),
                fps: 0.0,
                source: source.to_string(),
            },
            frame: Some(frame),
            remaining: repeat,
        }
    }

    /// Whether `path` names a still image by its extension.
    pub fn is_image_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                IMAGE_EXTENSIONS.contains(&e.as_str())
            })
            .unwrap_or(false)
    }
}

impl Camera for ImageFileCamera {
    fn info(&self) -> &CameraInfo {
        &self.info
    }

    fn read_frame(&mut self) -> Option<Frame> {
        if self.remaining == 0 {
            self.frame = None;
            return None;
        }
        self.remaining -= 1;
        self.frame.clone()
    }

    fn release(&mut self) {
        self.frame = None;
        self.remaining = 0;
    }
}
