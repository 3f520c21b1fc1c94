pub mod headless_display;
pub mod snapshot_display;
pub mod video_file_display;
