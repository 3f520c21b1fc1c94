use crate::display::domain::display::Display;
use crate::display::domain::quit_signal::QuitSignal;
use crate::shared::frame::Frame;

/// Discards frames; only counts them and honors the quit signal.
pub struct HeadlessDisplay {
    quit: QuitSignal,
    shown: u64,
}

impl HeadlessDisplay {
    pub fn new(quit: QuitSignal) -> Self {
        Self { quit, shown: 0 }
    }

    pub fn shown(&self) -> u64 {
        self.shown
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.shown += 1;
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        self.quit.is_requested()
    }

    fn close(&mut self) {}
}
