use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

/// Domain interface for exchanging two faces within a frame.
///
/// Implementations modify the frame in-place. No state is carried between
/// calls; `face_a`/`face_b` are in frame coordinates.
pub trait FaceCompositor: Send {
    fn swap(
        &self,
        frame: &mut Frame,
        face_a: Rect,
        face_b: Rect,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
