use std::path::PathBuf;

use crate::shared::geometry::Size;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    pub fn frame_size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }
}
