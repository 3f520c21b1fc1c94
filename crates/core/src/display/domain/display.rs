use crate::shared::frame::Frame;

/// Presents annotated frames and reports whether the user asked to quit.
pub trait Display: Send {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Non-blocking; true once a quit has been requested.
    fn poll_quit(&mut self) -> bool;

    /// Flushes and releases the output. Must be safe to call more than once.
    fn close(&mut self);
}
