use std::path::Path;

use crate::capture::domain::camera::{Camera, CameraInfo};
use crate::shared::frame::Frame;

/// Decoder state for an open stream.
struct Stream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    flushing: bool,
}

/// Captures frames from a video file, URL or capture device via ffmpeg-next.
///
/// Frames are decoded lazily and converted to RGB24. A decode failure
/// mid-stream ends the capture the same way end of file does.
pub struct FfmpegCamera {
    stream: Option<Stream>,
    info: CameraInfo,
    frames_read: u64,
}

// Safety: FfmpegCamera is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    /// Opens a file or URL, letting ffmpeg probe the container.
    pub fn open(source: &str) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let ictx = ffmpeg_next::format::input(Path::new(source))?;
        Self::from_input(ictx, source)
    }

    /// Opens a capture device through a named input format such as
    /// `v4l2`, `avfoundation` or `dshow`.
    pub fn open_device(source: &str, format: &str) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        ffmpeg_next::device::register_all();

        let input_format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == format)
            .ok_or_else(|| format!("Unknown capture format: {format}"))?;

        let ctx = ffmpeg_next::format::open_with(
            Path::new(source),
            &input_format,
            ffmpeg_next::Dictionary::new(),
        )?;
        match ctx {
            ffmpeg_next::format::context::Context::Input(ictx) => Self::from_input(ictx, source),
            ffmpeg_next::format::context::Context::Output(_) => {
                Err(format!("{format} is not an input format").into())
            }
        }
    }

    fn from_input(
        ictx: ffmpeg_next::format::context::Input,
        source: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!("Opened {source}: {width}x{height} @ {fps:.2} fps");

        Ok(Self {
            stream: Some(Stream {
                ictx,
                decoder,
                scaler,
                stream_index,
                flushing: false,
            }),
            info: CameraInfo {
                width,
                height,
                fps,
                source: source.to_string(),
            },
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        let (width, height) = (self.info.width, self.info.height);

        loop {
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if stream.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
                stream.scaler.run(&decoded, &mut rgb_frame)?;
                let pixels = extract_rgb_pixels(&rgb_frame, width, height);
                return Ok(Some(Frame::new(pixels, width, height, 3, self.frames_read)));
            }

            if stream.flushing {
                return Ok(None);
            }

            match stream.ictx.packets().next() {
                Some((packet_stream, packet)) => {
                    if packet_stream.index() != stream.stream_index {
                        continue;
                    }
                    if let Err(e) = stream.decoder.send_packet(&packet) {
                        log::debug!("Skipping undecodable packet: {e}");
                    }
                }
                None => {
                    let _ = stream.decoder.send_eof();
                    stream.flushing = true;
                }
            }
        }
    }
}

impl Camera for FfmpegCamera {
    fn info(&self) -> &CameraInfo {
        &self.info
    }

    fn read_frame(&mut self) -> Option<Frame> {
        match self.next_frame() {
            Ok(Some(frame)) => {
                self.frames_read += 1;
                Some(frame)
            }
            Ok(None) => {
                self.release();
                None
            }
            Err(e) => {
                log::warn!("Capture from {} failed: {e}", self.info.source);
                self.release();
                None
            }
        }
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            log::debug!(
                "Released {} after {} frames",
                self.info.source,
                self.frames_read
            );
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
