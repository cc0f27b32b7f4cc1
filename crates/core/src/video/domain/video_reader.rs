use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Source of frames for the swap pipeline.
///
/// Implementations own the decoding details; the pipeline only sees
/// `Frame` and `VideoMetadata`.
pub trait VideoReader: Send {
    /// Opens the source and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Frames in presentation order, indexed from 0.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
