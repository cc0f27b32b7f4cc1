use crate::shared::frame::Frame;
use crate::shared::geometry::{Point, Rect};

/// Domain interface for the facial-landmark regression model.
///
/// Given an image and a face rectangle in that image's coordinates, returns
/// the keypoints in the model's canonical order (jaw, brows, nose, eyes,
/// mouth). The compositor expects the 68-point layout.
pub trait LandmarkPredictor: Send {
    fn predict(
        &self,
        image: &Frame,
        face: Rect,
    ) -> Result<Vec<Point>, Box<dyn std::error::Error>>;
}
