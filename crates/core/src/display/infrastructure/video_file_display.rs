use std::path::{Path, PathBuf};

use crate::display::domain::display::Display;
use crate::display::domain::quit_signal::QuitSignal;
use crate::shared::frame::Frame;

const FALLBACK_FPS: i32 = 30;

struct Encoder {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
}

/// Encodes shown frames into an MPEG-4 video file via ffmpeg-next.
///
/// The encoder is opened on the first frame, which fixes the output size.
/// Frames of a different size are rejected.
pub struct VideoFileDisplay {
    path: PathBuf,
    fps: i32,
    quit: QuitSignal,
    encoder: Option<Encoder>,
    frames_written: u64,
}

// Safety: VideoFileDisplay is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for VideoFileDisplay {}

impl VideoFileDisplay {
    pub fn new(path: &Path, fps: f64, quit: QuitSignal) -> Self {
        let fps = fps.round() as i32;
        Self {
            path: path.to_path_buf(),
            fps: if fps <= 0 { FALLBACK_FPS } else { fps },
            quit,
            encoder: None,
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn open(&self, width: u32, height: u32) -> Result<Encoder, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut octx = ffmpeg_next::format::output(&self.path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, self.fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(self.fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "Writing {}x{} @ {} fps to {}",
            width,
            height,
            self.fps,
            self.path.display()
        );

        Ok(Encoder {
            octx,
            encoder,
            scaler,
            width,
            height,
        })
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(mut enc) = self.encoder.take() else {
            return Ok(());
        };
        enc.encoder.send_eof()?;
        drain_packets(&mut enc, self.fps)?;
        enc.octx.write_trailer()?;
        log::info!(
            "Wrote {} frames to {}",
            self.frames_written,
            self.path.display()
        );
        Ok(())
    }
}

impl Display for VideoFileDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("Expected RGB frame, got {} channels", frame.channels()).into());
        }
        if self.encoder.is_none() {
            self.encoder = Some(self.open(frame.width(), frame.height())?);
        }
        let fps = self.fps;
        let pts = self.frames_written as i64;
        let enc = self.encoder.as_mut().ok_or("VideoFileDisplay: not opened")?;

        if frame.width() != enc.width || frame.height() != enc.height {
            return Err(format!(
                "Frame size {}x{} does not match output {}x{}",
                frame.width(),
                frame.height(),
                enc.width,
                enc.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            enc.width,
            enc.height,
        );
        let stride = rgb_frame.stride(0);
        let row_bytes = enc.width as usize * 3;
        let dst = rgb_frame.data_mut(0);
        for (row, src) in frame.data().chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            dst[start..start + row_bytes].copy_from_slice(src);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        enc.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(pts));

        enc.encoder.send_frame(&yuv_frame)?;
        drain_packets(enc, fps)?;

        self.frames_written += 1;
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        self.quit.is_requested()
    }

    fn close(&mut self) {
        if let Err(e) = self.finish() {
            log::warn!("Failed to finalize {}: {e}", self.path.display());
        }
    }
}

impl Drop for VideoFileDisplay {
    fn drop(&mut self) {
        self.close();
    }
}

fn drain_packets(enc: &mut Encoder, fps: i32) -> Result<(), Box<dyn std::error::Error>> {
    let time_base = enc
        .octx
        .stream(0)
        .ok_or("Output stream missing")?
        .time_base();
    let mut packet = ffmpeg_next::Packet::empty();
    while enc.encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(0);
        packet.rescale_ts(ffmpeg_next::Rational(1, fps), time_base);
        packet.write_interleaved(&mut enc.octx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::camera::Camera;
    use crate::capture::infrastructure::ffmpeg_camera::FfmpegCamera;

    fn frame(width: u32, height: u32, index: u64) -> Frame {
        Frame::new(vec![90u8; (width * height * 3) as usize], width, height, 3, index)
    }

    #[test]
    fn test_written_video_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let mut display = VideoFileDisplay::new(&path, 24.0, QuitSignal::new());

        for i in 1..=4 {
            display.show(&frame(96, 64, i)).unwrap();
        }
        display.close();
        assert_eq!(display.frames_written(), 4);

        let mut camera = FfmpegCamera::open(path.to_str().unwrap()).unwrap();
        assert_eq!(camera.info().width, 96);
        assert_eq!(camera.info().height, 64);
        let mut count = 0;
        while camera.read_frame().is_some() {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn test_size_change_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut display = VideoFileDisplay::new(&dir.path().join("out.mp4"), 30.0, QuitSignal::new());

        display.show(&frame(64, 48, 1)).unwrap();
        assert!(display.show(&frame(32, 24, 2)).is_err());
    }

    #[test]
    fn test_non_rgb_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut display = VideoFileDisplay::new(&dir.path().join("out.mp4"), 30.0, QuitSignal::new());
        let rgba = Frame::new(vec![0u8; 8 * 8 * 4], 8, 8, 4, 1);
        assert!(display.show(&rgba).is_err());
    }

    #[test]
    fn test_close_without_frames_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let mut display = VideoFileDisplay::new(&path, 30.0, QuitSignal::new());
        display.close();
        display.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_zero_fps_falls_back() {
        let display = VideoFileDisplay::new(Path::new("out.mp4"), 0.0, QuitSignal::new());
        assert_eq!(display.fps, FALLBACK_FPS);
    }

    #[test]
    fn test_poll_quit_follows_signal() {
        let quit = QuitSignal::new();
        let mut display = VideoFileDisplay::new(Path::new("out.mp4"), 30.0, quit.clone());
        assert!(!display.poll_quit());
        quit.request();
        assert!(display.poll_quit());
    }
}
