pub mod display;
pub mod quit_signal;
