use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

const DEFAULT_FPS: f64 = 30.0;

/// Plays back a directory of still images as a video, in file name order.
///
/// A single image file is accepted as a one-frame sequence. Stands in for a
/// live camera when replaying recorded footage.
pub struct ImageSequenceReader {
    fps: f64,
    paths: Vec<PathBuf>,
    opened: bool,
}

impl ImageSequenceReader {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            paths: Vec::new(),
            opened: false,
        }
    }
}

impl Default for ImageSequenceReader {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn list_images(path: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    paths.sort();
    Ok(paths)
}

fn load_frame(path: &Path, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, 3, index))
}

impl VideoReader for ImageSequenceReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let paths = list_images(path)?;
        let first = paths
            .first()
            .ok_or_else(|| format!("No images found in {}", path.display()))?;
        let (width, height) = image::image_dimensions(first)?;

        log::debug!(
            "Opened {} frames of {}x{} from {}",
            paths.len(),
            width,
            height,
            path.display()
        );
        let metadata = VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames: paths.len(),
            source_path: Some(path.to_path_buf()),
        };
        self.paths = paths;
        self.opened = true;
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        if !self.opened {
            return Box::new(std::iter::once(Err(
                "ImageSequenceReader: not opened".into()
            )));
        }
        Box::new(
            self.paths
                .iter()
                .enumerate()
                .map(|(i, path)| load_frame(path, i)),
        )
    }

    fn close(&mut self) {
        self.paths.clear();
        self.opened = false;
    }
}
