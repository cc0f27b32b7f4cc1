use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Writes each frame as `frame_NNNNNN.png` into a directory, numbered by
/// the frame's index.
pub struct ImageSequenceWriter {
    dir: Option<PathBuf>,
    written: usize,
}

impl ImageSequenceWriter {
    pub fn new() -> Self {
        Self {
            dir: None,
            written: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.written
    }
}

impl Default for ImageSequenceWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn frame_file_name(index: usize) -> String {
    format!("frame_{index:06}.png")
}

impl VideoWriter for ImageSequenceWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::create_dir_all(path)?;
        log::debug!(
            "Writing {}x{} frames to {}",
            metadata.width,
            metadata.height,
            path.display()
        );
        self.dir = Some(path.to_path_buf());
        self.written = 0;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let dir = self
            .dir
            .as_ref()
            .ok_or("ImageSequenceWriter: not opened")?;
        if frame.channels() != 3 {
            return Err(format!("expected an RGB frame, got {} channels", frame.channels()).into());
        }
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        img.save(dir.join(frame_file_name(frame.index())))?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.dir = None;
        Ok(())
    }
}
