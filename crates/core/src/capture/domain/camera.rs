use crate::shared::frame::Frame;

/// Stream properties known once a capture source is open.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraInfo {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; 0 when the source does not report one.
    pub fps: f64,
    pub source: String,
}

/// A source of frames, read one at a time.
///
/// `read_frame` returns `None` once the source is exhausted or fails;
/// the loop treats both as end of stream. `release` frees the underlying
/// device and must be safe to call more than once.
pub trait Camera: Send {
    fn info(&self) -> &CameraInfo;

    fn read_frame(&mut self) -> Option<Frame>;

    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_clone_is_equal() {
        let info = CameraInfo {
            width: 640,
            height: 480,
            fps: 30.0,
            source: "/dev/video0".to_string(),
        };
        assert_eq!(info.clone(), info);
    }
}
