use thiserror::Error;

use crate::compositing::domain::affine_transform::{AffineError, AffineTransform};
use crate::compositing::domain::face_compositor::FaceCompositor;
use crate::detection::domain::face_landmarks::{FaceLandmarks, LandmarkError};
use crate::detection::domain::landmark_predictor::LandmarkPredictor;
use crate::shared::constants::{FEATHER_DIVISOR, SWAP_MARGIN};
use crate::shared::frame::Frame;
use crate::shared::geometry::{Rect, Size};
use crate::shared::mask::Mask;

use super::blend::alpha_blend;
use super::histogram::specify_histogram;
use super::morphology::feather;
use super::raster::{copy_masked, extract_masked, fill_convex_poly, warp_frame, warp_mask};

#[derive(Clone, Debug, PartialEq)]
pub struct SwapperConfig {
    /// Context kept around the two faces when cutting the working sub-frame.
    pub margin: i32,
    /// Feather radius is the jaw width divided by this.
    pub feather_divisor: i32,
}

impl Default for SwapperConfig {
    fn default() -> Self {
        Self {
            margin: SWAP_MARGIN,
            feather_divisor: FEATHER_DIVISOR,
        }
    }
}

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("faces {a:?} and {b:?} leave no working area inside the frame")]
    EmptyWorkingArea { a: Rect, b: Rect },
    #[error("landmark prediction failed: {0}")]
    Prediction(String),
    #[error(transparent)]
    Landmarks(#[from] LandmarkError),
    #[error("cannot align faces: {0}")]
    Alignment(#[from] AffineError),
}

/// Rectangles the swap works with. `local_*` and `big_*` are relative to
/// `bounding`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapGeometry {
    /// Union of both faces plus margin, clipped to the frame.
    pub bounding: Rect,
    pub local_a: Rect,
    pub local_b: Rect,
    /// Faces grown by half their size, clipped to the sub-frame. Color
    /// correction and feathering stay inside these.
    pub big_a: Rect,
    pub big_b: Rect,
}

impl SwapGeometry {
    pub fn new(frame_size: Size, face_a: Rect, face_b: Rect, margin: i32) -> Option<Self> {
        let bounding = face_a
            .union(&face_b)
            .inflated(margin, margin)
            .clipped_to(frame_size);
        if bounding.is_empty() {
            return None;
        }
        let local_a = face_a.translated(-bounding.x, -bounding.y);
        let local_b = face_b.translated(-bounding.x, -bounding.y);
        let sub = bounding.size();
        Some(Self {
            bounding,
            local_a,
            local_b,
            big_a: grown_by_half(&local_a).clipped_to(sub),
            big_b: grown_by_half(&local_b).clipped_to(sub),
        })
    }
}

fn grown_by_half(r: &Rect) -> Rect {
    Rect::new(
        r.x - r.width / 4,
        r.y - r.height / 4,
        r.width + r.width / 2,
        r.height + r.height / 2,
    )
}

/// CPU face swapper driven by a 68-point landmark model.
///
/// Aligns the two faces through their chin/eye-corner triads, cross-warps
/// each face onto the other's outline, matches skin tone per channel and
/// blends through a feathered mask. Only the working sub-frame around the
/// two faces is touched.
pub struct CpuFaceSwapper {
    predictor: Box<dyn LandmarkPredictor>,
    config: SwapperConfig,
}

impl CpuFaceSwapper {
    pub fn new(predictor: Box<dyn LandmarkPredictor>) -> Self {
        Self::with_config(predictor, SwapperConfig::default())
    }

    pub fn with_config(predictor: Box<dyn LandmarkPredictor>, config: SwapperConfig) -> Self {
        Self { predictor, config }
    }

    pub fn config(&self) -> &SwapperConfig {
        &self.config
    }

    pub fn swap_faces(&self, frame: &mut Frame, face_a: Rect, face_b: Rect) -> Result<(), SwapError> {
        let geometry = SwapGeometry::new(frame.size(), face_a, face_b, self.config.margin)
            .ok_or(SwapError::EmptyWorkingArea { a: face_a, b: face_b })?;
        let mut sub = frame.crop(geometry.bounding);
        let size = sub.size();

        let landmarks_a = self.landmarks(&sub, geometry.local_a)?;
        let landmarks_b = self.landmarks(&sub, geometry.local_b)?;

        let a_to_b = AffineTransform::from_triads(
            &landmarks_a.alignment_triad(),
            &landmarks_b.alignment_triad(),
        )?;
        let b_to_a = a_to_b.inverse()?;

        let mask_a = outline_mask(size, &landmarks_a);
        let mask_b = outline_mask(size, &landmarks_b);

        // Warps take the destination-to-source map: moving A onto B samples
        // through B->A.
        let warped_mask_a = warp_mask(&mask_a, &b_to_a);
        let warped_mask_b = warp_mask(&mask_b, &a_to_b);
        let mut refined = mask_a.and(&warped_mask_b).or(&mask_b.and(&warped_mask_a));

        let mut warped_faces = Frame::black(sub.width(), sub.height(), sub.channels());
        let face_on_b = warp_frame(&extract_masked(&sub, &mask_a), &b_to_a);
        let face_on_a = warp_frame(&extract_masked(&sub, &mask_b), &a_to_b);
        copy_masked(&face_on_b, &mut warped_faces, &warped_mask_a);
        copy_masked(&face_on_a, &mut warped_faces, &warped_mask_b);

        match_region(&sub, &mut warped_faces, &warped_mask_b, geometry.big_a);
        match_region(&sub, &mut warped_faces, &warped_mask_a, geometry.big_b);

        let radius = self.feather_radius(&landmarks_a, &landmarks_b);
        feather(&mut refined, geometry.big_a, radius);
        feather(&mut refined, geometry.big_b, radius);

        alpha_blend(&mut sub, &warped_faces, &refined);
        frame.paste(&sub, (geometry.bounding.x, geometry.bounding.y));

        log::debug!(
            "Swapped faces {:?} <-> {:?} (feather radius {})",
            face_a,
            face_b,
            radius
        );
        Ok(())
    }

    fn landmarks(&self, image: &Frame, face: Rect) -> Result<FaceLandmarks, SwapError> {
        let points = self
            .predictor
            .predict(image, face)
            .map_err(|e| SwapError::Prediction(e.to_string()))?;
        Ok(FaceLandmarks::new(points)?)
    }

    fn feather_radius(&self, a: &FaceLandmarks, b: &FaceLandmarks) -> i32 {
        let jaw = a.jaw_width().max(b.jaw_width()) as i32;
        (jaw / self.config.feather_divisor.max(1)).max(1)
    }
}

impl FaceCompositor for CpuFaceSwapper {
    fn swap(
        &self,
        frame: &mut Frame,
        face_a: Rect,
        face_b: Rect,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(self.swap_faces(frame, face_a, face_b)?)
    }
}

fn outline_mask(size: Size, landmarks: &FaceLandmarks) -> Mask {
    let mut mask = Mask::new(size);
    fill_convex_poly(&mut mask, &landmarks.outline(), 255);
    mask
}

/// Histogram-matches `target` toward `source` inside `region`, over the
/// pixels selected by `mask`.
fn match_region(source: &Frame, target: &mut Frame, mask: &Mask, region: Rect) {
    if region.is_empty() {
        return;
    }
    let source_patch = source.crop(region);
    let mut target_patch = target.crop(region);
    specify_histogram(&source_patch, &mut target_patch, &mask.crop(region));
    target.paste(&target_patch, (region.x, region.y));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::Point;
    use rstest::rstest;
    use std::f64::consts::PI;

    /// Landmarks laid out on a stylized face filling `face`.
    fn synthetic_landmarks(face: Rect) -> Vec<Point> {
        let (x, y) = (face.x as f64, face.y as f64);
        let (w, h) = (face.width as f64, face.height as f64);
        let (cx, cy) = (x + w / 2.0, y + h / 2.0);
        let mut pts = vec![Point::new(cx, cy); 68];

        for (i, p) in pts.iter_mut().take(17).enumerate() {
            let t = PI * i as f64 / 16.0;
            *p = Point::new(cx - 0.45 * w * t.cos(), cy + 0.45 * h * t.sin());
        }
        pts[17] = Point::new(x + 0.15 * w, y + 0.3 * h);
        pts[26] = Point::new(x + 0.85 * w, y + 0.3 * h);
        pts[27] = Point::new(cx, y + 0.35 * h);
        pts[30] = Point::new(cx, y + 0.6 * h);
        pts[36] = Point::new(x + 0.2 * w, y + 0.4 * h);
        pts[45] = Point::new(x + 0.8 * w, y + 0.4 * h);
        for p in pts.iter_mut().skip(48) {
            *p = Point::new(cx, y + 0.8 * h);
        }
        pts
    }

    struct SyntheticPredictor;

    impl LandmarkPredictor for SyntheticPredictor {
        fn predict(&self, _image: &Frame, face: Rect) -> Result<Vec<Point>, Box<dyn std::error::Error>> {
            Ok(synthetic_landmarks(face))
        }
    }

    struct FixedPredictor(Vec<Point>);

    impl LandmarkPredictor for FixedPredictor {
        fn predict(&self, _image: &Frame, _face: Rect) -> Result<Vec<Point>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct FailingPredictor;

    impl LandmarkPredictor for FailingPredictor {
        fn predict(&self, _image: &Frame, _face: Rect) -> Result<Vec<Point>, Box<dyn std::error::Error>> {
            Err("model not loaded".into())
        }
    }

    fn textured(width: u32, height: u32) -> Frame {
        let mut state = 0x2545_f491_u32;
        let data = (0..width * height * 3)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        Frame::new(data, width, height, 3, 0)
    }

    // ── geometry ────────────────────────────────────────────────────

    #[test]
    fn test_geometry_inside_frame() {
        let g = SwapGeometry::new(
            Size::new(640, 480),
            Rect::new(100, 100, 80, 80),
            Rect::new(300, 120, 60, 60),
            50,
        )
        .unwrap();
        assert_eq!(g.bounding, Rect::new(50, 50, 360, 180));
        assert_eq!(g.local_a, Rect::new(50, 50, 80, 80));
        assert_eq!(g.local_b, Rect::new(250, 70, 60, 60));
        assert_eq!(g.big_a, Rect::new(30, 30, 120, 120));
        assert_eq!(g.big_b, Rect::new(235, 55, 90, 90));
    }

    #[test]
    fn test_geometry_clipped_at_frame_edge() {
        let g = SwapGeometry::new(
            Size::new(240, 120),
            Rect::new(30, 30, 60, 60),
            Rect::new(150, 30, 60, 60),
            50,
        )
        .unwrap();
        assert_eq!(g.bounding, Rect::new(0, 0, 240, 120));
        assert_eq!(g.local_a, Rect::new(30, 30, 60, 60));
        assert_eq!(g.big_a, Rect::new(15, 15, 90, 90));
        assert_eq!(g.big_b, Rect::new(135, 15, 90, 90));
    }

    #[test]
    fn test_geometry_outside_frame() {
        let g = SwapGeometry::new(
            Size::new(100, 100),
            Rect::new(500, 500, 20, 20),
            Rect::new(600, 500, 20, 20),
            50,
        );
        assert_eq!(g, None);
    }

    // ── swap ────────────────────────────────────────────────────────

    #[test]
    fn test_self_swap_is_identity_within_one() {
        let original = textured(200, 160);
        let mut frame = original.clone();
        let face = Rect::new(60, 40, 70, 70);
        CpuFaceSwapper::new(Box::new(SyntheticPredictor))
            .swap_faces(&mut frame, face, face)
            .unwrap();

        let max_diff = original
            .data()
            .iter()
            .zip(frame.data())
            .map(|(&a, &b)| (a as i32 - b as i32).abs())
            .max()
            .unwrap();
        assert!(max_diff <= 1, "max diff {max_diff}");
        assert_ne!(frame, original);
    }

    /// Face A: dark left half, bright right half. Face B: dark top band,
    /// bright below.
    fn two_face_frame() -> (Frame, Rect, Rect) {
        let (a, b) = (Rect::new(30, 30, 60, 60), Rect::new(150, 30, 60, 60));
        let (w, h) = (240u32, 120u32);
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let v = if a.contains((x, y)) {
                    if x < a.x + a.width / 2 { 50 } else { 200 }
                } else if b.contains((x, y)) {
                    if y < b.y + 21 { 50 } else { 200 }
                } else {
                    120
                };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        (Frame::new(data, w, h, 3, 0), a, b)
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> u8 {
        frame.as_ndarray()[[y, x, 0]]
    }

    #[test]
    fn test_swap_moves_content_between_faces() {
        let (mut frame, a, b) = two_face_frame();
        CpuFaceSwapper::new(Box::new(SyntheticPredictor))
            .swap_faces(&mut frame, a, b)
            .unwrap();

        // A now shows B's dark band at the top and bright below.
        assert_eq!(pixel(&frame, 60, 42), 49);
        assert_eq!(pixel(&frame, 48, 72), 199);
        // B's own tones are mostly bright, so A's content is recolored
        // bright there, including B's former dark band.
        assert_eq!(pixel(&frame, 192, 42), 199);
        assert_eq!(pixel(&frame, 168, 72), 199);
    }

    #[test]
    fn test_swap_leaves_background_untouched() {
        let (original, a, b) = two_face_frame();
        let mut frame = original.clone();
        CpuFaceSwapper::new(Box::new(SyntheticPredictor))
            .swap_faces(&mut frame, a, b)
            .unwrap();
        for (x, y) in [(2, 2), (120, 60), (237, 117), (31, 31), (208, 88)] {
            assert_eq!(pixel(&frame, x, y), pixel(&original, x, y), "at ({x}, {y})");
        }
    }

    #[test]
    fn test_swap_through_compositor_trait() {
        let (mut frame, a, b) = two_face_frame();
        let compositor: Box<dyn FaceCompositor> = Box::new(CpuFaceSwapper::new(Box::new(SyntheticPredictor)));
        compositor.swap(&mut frame, a, b).unwrap();
        assert_eq!(pixel(&frame, 60, 42), 49);
    }

    // ── failures ────────────────────────────────────────────────────

    #[test]
    fn test_faces_outside_frame_rejected() {
        let mut frame = textured(64, 64);
        let err = CpuFaceSwapper::new(Box::new(SyntheticPredictor))
            .swap_faces(&mut frame, Rect::new(500, 500, 20, 20), Rect::new(600, 500, 20, 20))
            .unwrap_err();
        assert!(matches!(err, SwapError::EmptyWorkingArea { .. }));
    }

    #[test]
    fn test_predictor_failure_leaves_frame_untouched() {
        let original = textured(64, 64);
        let mut frame = original.clone();
        let err = CpuFaceSwapper::new(Box::new(FailingPredictor))
            .swap_faces(&mut frame, Rect::new(5, 5, 20, 20), Rect::new(35, 5, 20, 20))
            .unwrap_err();
        assert_eq!(err.to_string(), "landmark prediction failed: model not loaded");
        assert_eq!(frame, original);
    }

    #[test]
    fn test_short_landmark_list_rejected() {
        let mut frame = textured(64, 64);
        let err = CpuFaceSwapper::new(Box::new(FixedPredictor(vec![Point::default(); 5])))
            .swap_faces(&mut frame, Rect::new(5, 5, 20, 20), Rect::new(35, 5, 20, 20))
            .unwrap_err();
        assert!(matches!(err, SwapError::Landmarks(LandmarkError::WrongCount(5))));
    }

    #[test]
    fn test_collinear_triad_rejected() {
        let mut pts = synthetic_landmarks(Rect::new(0, 0, 20, 20));
        pts[8] = Point::new(10.0, 8.0);
        pts[36] = Point::new(4.0, 8.0);
        pts[45] = Point::new(16.0, 8.0);
        let mut frame = textured(64, 64);
        let err = CpuFaceSwapper::new(Box::new(FixedPredictor(pts)))
            .swap_faces(&mut frame, Rect::new(5, 5, 20, 20), Rect::new(35, 5, 20, 20))
            .unwrap_err();
        assert!(matches!(err, SwapError::Alignment(AffineError::CollinearPoints)));
    }

    #[rstest]
    #[case::default_divisor(8, 6)]
    #[case::coarse(4, 13)]
    #[case::tiny_face(1000, 1)]
    fn test_feather_radius_uses_larger_jaw(#[case] divisor: i32, #[case] expected: i32) {
        let swapper = CpuFaceSwapper::with_config(
            Box::new(SyntheticPredictor),
            SwapperConfig {
                feather_divisor: divisor,
                ..SwapperConfig::default()
            },
        );
        let small = FaceLandmarks::new(synthetic_landmarks(Rect::new(0, 0, 40, 40))).unwrap();
        let large = FaceLandmarks::new(synthetic_landmarks(Rect::new(0, 0, 60, 60))).unwrap();
        assert_eq!(swapper.feather_radius(&small, &large), expected);
    }
}
