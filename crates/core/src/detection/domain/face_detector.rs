use crate::shared::frame::Frame;
use crate::shared::geometry::{Rect, Size};

/// Domain interface for the statistical face-region detector.
///
/// Returns candidates whose side lies within `[min_size, max_size]`, in the
/// detector's own ranking order; callers only rely on that order to pick the
/// first N. Implementations may cache internally, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(
        &mut self,
        image: &Frame,
        min_size: Size,
        max_size: Size,
    ) -> Result<Vec<Rect>, Box<dyn std::error::Error>>;
}
