pub mod attribute_aggregator;
pub mod face_annotation;
pub mod label_translator;
pub mod overlay_renderer;
