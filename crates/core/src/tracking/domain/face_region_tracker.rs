use std::time::Duration;

use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::clock::{Clock, SystemClock};
use crate::shared::constants::{
    NUM_FACES, ROI_MAX_FACE_FRACTION, ROI_MIN_FACE_FRACTION, SEARCH_MAX_FACE_FRACTION,
    SEARCH_MIN_FACE_FRACTION, TEMPLATE_FALLBACK_MAX_DURATION, WORKING_FRAME_WIDTH,
};
use crate::shared::frame::Frame;
use crate::shared::geometry::{double_rect_size, Rect, Size};
use crate::tracking::domain::track_state::TrackState;
use crate::tracking::infrastructure::template_matcher::match_template;

#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    pub num_faces: usize,
    pub working_width: u32,
    pub fallback_timeout: Duration,
    pub search_min_fraction: f64,
    pub search_max_fraction: f64,
    pub roi_min_fraction: f64,
    pub roi_max_fraction: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            num_faces: NUM_FACES,
            working_width: WORKING_FRAME_WIDTH,
            fallback_timeout: TEMPLATE_FALLBACK_MAX_DURATION,
            search_min_fraction: SEARCH_MIN_FACE_FRACTION,
            search_max_fraction: SEARCH_MAX_FACE_FRACTION,
            roi_min_fraction: ROI_MIN_FACE_FRACTION,
            roi_max_fraction: ROI_MAX_FACE_FRACTION,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrackerInitError {
    #[error("camera resolution {width}x{height} is empty")]
    EmptyResolution { width: i32, height: i32 },
    #[error("working frame for {width}x{height} at width {working_width} has no rows")]
    DegenerateWorkingSize {
        width: i32,
        height: i32,
        working_width: u32,
    },
    #[error("at least one face slot is required")]
    NoFaceSlots,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerPhase {
    /// Full-frame detection every frame until enough faces show up.
    Searching,
    /// Per-slot re-detection inside each ROI, falling back to template
    /// matching.
    Tracking,
}

/// Why tracking was abandoned. Never surfaced as an error; the tracker just
/// goes back to searching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LostTrack {
    DegenerateTemplate,
    TemplateDoesNotFit,
    FallbackTimeout,
    Overlap,
}

enum SlotOutcome {
    Kept,
    Lost(LostTrack),
}

/// Detect/track state machine for a fixed number of face slots.
///
/// Works on a downscaled copy of every frame. Full-frame detection runs only
/// while searching; once every slot has a face, each slot is re-detected in
/// its own ROI, with template matching bridging short detection gaps.
pub struct FaceRegionTracker {
    detector: Box<dyn FaceDetector>,
    clock: Box<dyn Clock>,
    config: TrackerConfig,
    native_size: Size,
    working_size: Size,
    ratio: (f64, f64),
    /// Empty while searching, exactly `num_faces` entries while tracking.
    slots: Vec<TrackState>,
}

impl FaceRegionTracker {
    /// `native_size` is the camera resolution; the downscale ratio is fixed
    /// from it here.
    pub fn new(
        detector: Box<dyn FaceDetector>,
        native_size: Size,
        config: TrackerConfig,
    ) -> Result<Self, TrackerInitError> {
        if native_size.is_empty() {
            return Err(TrackerInitError::EmptyResolution {
                width: native_size.width,
                height: native_size.height,
            });
        }
        if config.num_faces == 0 {
            return Err(TrackerInitError::NoFaceSlots);
        }

        let working_width = config.working_width as i32;
        let working_height =
            (working_width as i64 * native_size.height as i64 / native_size.width as i64) as i32;
        if working_width <= 0 || working_height <= 0 {
            return Err(TrackerInitError::DegenerateWorkingSize {
                width: native_size.width,
                height: native_size.height,
                working_width: config.working_width,
            });
        }

        let working_size = Size::new(working_width, working_height);
        let ratio = (
            native_size.width as f64 / working_width as f64,
            native_size.height as f64 / working_height as f64,
        );
        log::debug!(
            "Tracker working at {}x{} (ratio {:.3}x{:.3})",
            working_size.width,
            working_size.height,
            ratio.0,
            ratio.1
        );

        Ok(Self {
            detector,
            clock: Box::new(SystemClock::new()),
            config,
            native_size,
            working_size,
            ratio,
            slots: Vec::new(),
        })
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn phase(&self) -> TrackerPhase {
        if self.slots.is_empty() {
            TrackerPhase::Searching
        } else {
            TrackerPhase::Tracking
        }
    }

    /// Number of face slots filled while tracking.
    pub fn num_faces(&self) -> usize {
        self.config.num_faces
    }

    pub fn native_size(&self) -> Size {
        self.native_size
    }

    pub fn working_size(&self) -> Size {
        self.working_size
    }

    pub fn ratio(&self) -> (f64, f64) {
        self.ratio
    }

    pub fn slots(&self) -> &[TrackState] {
        &self.slots
    }

    /// Advances the state machine by one frame. Errors only come from the
    /// detector itself; losing faces is not an error.
    pub fn ingest_frame(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let working = frame.resized(
            self.working_size.width as u32,
            self.working_size.height as u32,
        )?;

        match self.phase() {
            TrackerPhase::Searching => self.search(&working),
            TrackerPhase::Tracking => self.track(&working),
        }
    }

    /// Tracked faces in native frame coordinates; empty while searching.
    pub fn current_faces(&self) -> Vec<Rect> {
        self.slots
            .iter()
            .map(|s| s.face.scaled(self.ratio.0, self.ratio.1))
            .collect()
    }

    /// Tracked faces in working-resolution coordinates.
    pub fn working_faces(&self) -> Vec<Rect> {
        self.slots.iter().map(|s| s.face).collect()
    }

    fn search(&mut self, working: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let rows = working.height() as i32;
        let min_size = Size::square(fraction_of(rows, self.config.search_min_fraction));
        let max_size = Size::square(fraction_of(rows, self.config.search_max_fraction));

        let mut faces = self.detector.detect(working, min_size, max_size)?;
        if faces.len() < self.config.num_faces {
            return Ok(());
        }
        faces.truncate(self.config.num_faces);

        self.slots = faces
            .into_iter()
            .map(|face| {
                let template = working.crop(face.centered_half());
                let roi = double_rect_size(&face, working.size());
                TrackState::new(face, roi, template)
            })
            .collect();
        log::debug!("Found {} faces, tracking", self.slots.len());
        Ok(())
    }

    /// Steps every slot on a copy and commits only once all of them have
    /// succeeded, so a detector error leaves the previous frame's state.
    fn track(&mut self, working: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let now = self.clock.now();

        let mut next = Vec::with_capacity(self.slots.len());
        let mut lost = None;
        for slot in &self.slots {
            let mut slot = slot.clone();
            let outcome =
                track_slot(self.detector.as_mut(), &mut slot, working, now, &self.config)?;
            if let SlotOutcome::Lost(reason) = outcome {
                lost = Some(reason);
                break;
            }
            next.push(slot);
        }

        match lost.or_else(|| any_overlap(&next).then_some(LostTrack::Overlap)) {
            Some(reason) => self.lose_track(reason),
            None => self.slots = next,
        }
        Ok(())
    }

    fn lose_track(&mut self, reason: LostTrack) {
        log::debug!("Lost track ({reason:?}), searching");
        self.slots.clear();
    }
}

/// One tracking step for a single slot.
fn track_slot(
    detector: &mut dyn FaceDetector,
    slot: &mut TrackState,
    working: &Frame,
    now: Duration,
    config: &TrackerConfig,
) -> Result<SlotOutcome, Box<dyn std::error::Error>> {
    let roi = slot.roi;
    let roi_image = working.crop(roi);

    // A ROI clipped to nothing counts as "no candidate".
    let candidates = if roi_image.is_empty() {
        Vec::new()
    } else {
        let min_size = Size::new(
            fraction_of(roi.width, config.roi_min_fraction),
            fraction_of(roi.height, config.roi_min_fraction),
        );
        let max_size = Size::new(
            fraction_of(roi.width, config.roi_max_fraction),
            fraction_of(roi.height, config.roi_max_fraction),
        );
        detector.detect(&roi_image, min_size, max_size)?
    };

    if let Some(first) = candidates.first() {
        slot.redetected(first.translated(roi.x, roi.y));
        return Ok(SlotOutcome::Kept);
    }

    if !slot.is_fallback_active() {
        log::debug!("No detection in ROI {roi:?}, falling back to template matching");
    }
    let elapsed = slot.fallback_elapsed(now);

    if slot.template_degenerate() {
        return Ok(SlotOutcome::Lost(LostTrack::DegenerateTemplate));
    }
    let Some(found) = match_template(&roi_image, &slot.template) else {
        return Ok(SlotOutcome::Lost(LostTrack::TemplateDoesNotFit));
    };

    // The template is the center half of the face, so the face extends half
    // a template beyond it on each side.
    let tw = slot.template.width() as i32;
    let th = slot.template.height() as i32;
    slot.face = Rect::new(
        roi.x + found.x - tw / 2,
        roi.y + found.y - th / 2,
        tw * 2,
        th * 2,
    );

    if elapsed > config.fallback_timeout {
        return Ok(SlotOutcome::Lost(LostTrack::FallbackTimeout));
    }
    Ok(SlotOutcome::Kept)
}

fn any_overlap(slots: &[TrackState]) -> bool {
    slots.iter().enumerate().any(|(i, a)| {
        slots[i + 1..]
            .iter()
            .any(|b| a.face.overlaps(&b.face))
    })
}

/// `floor(len * fraction)`, nudged so that fractions such as 2/3 that are not
/// exact in binary still land on the integer result.
fn fraction_of(len: i32, fraction: f64) -> i32 {
    (len as f64 * fraction + 1e-9).floor() as i32
}
