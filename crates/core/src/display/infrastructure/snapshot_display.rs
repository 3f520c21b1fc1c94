use std::path::{Path, PathBuf};

use crate::display::domain::display::Display;
use crate::display::domain::quit_signal::QuitSignal;
use crate::shared::frame::Frame;

/// Writes every Nth shown frame as a PNG named after its frame index.
pub struct SnapshotDisplay {
    dir: PathBuf,
    every: u64,
    quit: QuitSignal,
    shown: u64,
    written: Vec<PathBuf>,
}

impl SnapshotDisplay {
    pub fn new(
        dir: &Path,
        every: u64,
        quit: QuitSignal,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if every < 1 {
            return Err("snapshot interval must be >= 1".into());
        }
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            every,
            quit,
            shown: 0,
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Display for SnapshotDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.shown += 1;
        if (self.shown - 1) % self.every != 0 {
            return Ok(());
        }

        let path = self.dir.join(format!("frame_{:06}.png", frame.index()));
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        img.save(&path)?;
        log::debug!("Wrote snapshot {}", path.display());
        self.written.push(path);
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        self.quit.is_requested()
    }

    fn close(&mut self) {
        if self.shown > 0 {
            log::info!(
                "Wrote {} snapshots to {}",
                self.written.len(),
                self.dir.display()
            );
            self.shown = 0;
        }
    }
}
