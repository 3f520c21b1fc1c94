use crate::annotation::domain::face_annotation::FaceAnnotation;
use crate::shared::frame::Frame;

/// Draws face annotations onto a frame in place.
pub trait OverlayRenderer: Send {
    fn render(
        &self,
        frame: &mut Frame,
        annotations: &[FaceAnnotation],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
