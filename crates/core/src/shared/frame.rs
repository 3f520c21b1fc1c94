use image::{ImageBuffer, Rgb};
use ndarray::ArrayView3;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque. `index` is stamped by the annotation loop
/// with its frame counter, so analyzers can key off it.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn set_index(&mut self, index: u64) {
        self.index = index;
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Borrows the pixels as an `image` buffer for in-place drawing.
    ///
    /// Returns `None` unless the frame is 3-channel RGB.
    pub fn as_rgb_image_mut(&mut self) -> Option<ImageBuffer<Rgb<u8>, &mut [u8]>> {
        if self.channels != 3 {
            return None;
        }
        ImageBuffer::from_raw(self.width, self.height, self.data.as_mut_slice())
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_set_index() {
        let mut frame = Frame::new(vec![0u8; 3], 1, 1, 3, 0);
        frame.set_index(42);
        assert_eq!(frame.index(), 42);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, R
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_rgb_image_view_writes_through() {
        let mut frame = Frame::new(vec![0u8; 12], 2, 2, 3, 0);
        {
            let mut img = frame.as_rgb_image_mut().unwrap();
            img.put_pixel(1, 0, Rgb([1, 2, 3]));
        }
        assert_eq!(&frame.data()[3..6], &[1, 2, 3]);
    }

    #[test]
    fn test_rgb_image_view_rejects_non_rgb() {
        let mut frame = Frame::new(vec![0u8; 4], 2, 2, 1, 0);
        assert!(frame.as_rgb_image_mut().is_none());
    }
}
