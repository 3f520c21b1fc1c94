pub mod imageproc_overlay_renderer;
