//! 68-point face landmarks reduced to the geometry the swap needs.
//!
//! The outline walks the jaw from ear to ear and closes over the forehead
//! with two synthesized points: the outer eyebrow points pushed up by the
//! nose-bridge vector, since the landmark model stops at the brows.

use thiserror::Error;

use crate::shared::constants::LANDMARK_COUNT;
use crate::shared::geometry::Point;

/// Jaw points kept for the outline, left ear to right ear through the chin.
const JAW_OUTLINE: [usize; 7] = [0, 3, 5, 8, 11, 13, 16];
const CHIN: usize = 8;
const LEFT_BROW_OUTER: usize = 17;
const RIGHT_BROW_OUTER: usize = 26;
const NOSE_BRIDGE_TOP: usize = 27;
const NOSE_BRIDGE_BOTTOM: usize = 30;
const LEFT_EYE_OUTER: usize = 36;
const RIGHT_EYE_OUTER: usize = 45;

pub const OUTLINE_LEN: usize = 9;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LandmarkError {
    #[error("expected exactly 68 landmarks, predictor returned {0}")]
    WrongCount(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<Point>,
}

impl FaceLandmarks {
    /// Points are snapped to the pixel grid, matching integer-valued models.
    pub fn new(points: Vec<Point>) -> Result<Self, LandmarkError> {
        if points.len() != LANDMARK_COUNT {
            return Err(LandmarkError::WrongCount(points.len()));
        }
        Ok(Self {
            points: points.iter().map(Point::rounded).collect(),
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Closed 9-point face outline: seven jaw points then the right and
    /// left forehead points.
    pub fn outline(&self) -> [Point; OUTLINE_LEN] {
        let p = &self.points;
        let nose_length = p[NOSE_BRIDGE_TOP] - p[NOSE_BRIDGE_BOTTOM];

        let mut outline = [Point::default(); OUTLINE_LEN];
        for (slot, &idx) in outline.iter_mut().zip(JAW_OUTLINE.iter()) {
            *slot = p[idx];
        }
        outline[7] = p[RIGHT_BROW_OUTER] + nose_length;
        outline[8] = p[LEFT_BROW_OUTER] + nose_length;
        outline
    }

    /// Chin and both outer eye corners.
    pub fn alignment_triad(&self) -> [Point; 3] {
        let p = &self.points;
        [p[CHIN], p[LEFT_EYE_OUTER], p[RIGHT_EYE_OUTER]]
    }

    /// Distance between the two outline endpoints (ear to ear).
    pub fn jaw_width(&self) -> f64 {
        let first = self.points[JAW_OUTLINE[0]];
        let last = self.points[JAW_OUTLINE[JAW_OUTLINE.len() - 1]];
        first.distance(&last)
    }
}
