use std::time::Duration;

use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

/// Everything the tracker keeps for one face slot, in working-resolution
/// coordinates.
///
/// Kept as one record per slot so the face rectangle, search window,
/// template and fallback timer can never drift out of step.
#[derive(Clone, Debug)]
pub struct TrackState {
    /// Current face rectangle.
    pub face: Rect,
    /// Search window for re-detection and template matching. Fixed at the
    /// moment the slot was created.
    pub roi: Rect,
    /// Center half of the face as first detected.
    pub template: Frame,
    /// When template-matching fallback started, if it is running.
    pub fallback_started: Option<Duration>,
}

impl TrackState {
    pub fn new(face: Rect, roi: Rect, template: Frame) -> Self {
        Self {
            face,
            roi,
            template,
            fallback_started: None,
        }
    }

    pub fn is_fallback_active(&self) -> bool {
        self.fallback_started.is_some()
    }

    /// Detection found the face again.
    pub fn redetected(&mut self, face: Rect) {
        self.face = face;
        self.fallback_started = None;
    }

    /// Starts the fallback timer if it is not already running and returns
    /// how long the fallback has been active.
    pub fn fallback_elapsed(&mut self, now: Duration) -> Duration {
        let started = *self.fallback_started.get_or_insert(now);
        now.saturating_sub(started)
    }

    /// A template of zero or one pixel in either dimension cannot be matched.
    pub fn template_degenerate(&self) -> bool {
        self.template.width() <= 1 || self.template.height() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(template_w: u32, template_h: u32) -> TrackState {
        TrackState::new(
            Rect::new(10, 10, 20, 20),
            Rect::new(0, 0, 40, 40),
            Frame::black(template_w, template_h, 3),
        )
    }

    #[test]
    fn test_new_has_no_fallback() {
        assert!(!state(10, 10).is_fallback_active());
    }

    #[test]
    fn test_fallback_timer_starts_once() {
        let mut s = state(10, 10);
        assert_eq!(s.fallback_elapsed(Duration::from_secs(5)), Duration::ZERO);
        assert!(s.is_fallback_active());
        assert_eq!(
            s.fallback_elapsed(Duration::from_millis(6500)),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_redetection_clears_fallback() {
        let mut s = state(10, 10);
        s.fallback_elapsed(Duration::from_secs(1));
        s.redetected(Rect::new(12, 11, 20, 20));
        assert!(!s.is_fallback_active());
        assert_eq!(s.face, Rect::new(12, 11, 20, 20));
        assert_eq!(s.fallback_elapsed(Duration::from_secs(9)), Duration::ZERO);
    }

    #[test]
    fn test_template_degenerate() {
        assert!(state(1, 10).template_degenerate());
        assert!(state(10, 0).template_degenerate());
        assert!(!state(2, 2).template_degenerate());
    }
}
