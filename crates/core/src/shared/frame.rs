use ndarray::{s, ArrayView3, ArrayViewMut3};
use thiserror::Error;

use crate::shared::geometry::{Rect, Size};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("cannot resize a frame with {0} channels")]
    UnsupportedChannels(u8),
}

/// A single camera frame: contiguous interleaved bytes in row-major order.
///
/// The tracker and compositor only ever see 3-channel frames; sub-frames
/// cropped out for detection or compositing are owned copies.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Checked constructor for buffers coming from outside the crate.
    pub fn try_new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        index: usize,
    ) -> Result<Self, FrameError> {
        let expected = (width as usize) * (height as usize) * (channels as usize);
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::new(data, width, height, channels, index))
    }

    pub fn black(width: u32, height: u32, channels: u8) -> Self {
        let len = (width as usize) * (height as usize) * (channels as usize);
        Self::new(vec![0; len], width, height, channels, 0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Owned copy of `rect` clipped to the frame. An empty intersection
    /// yields an empty frame.
    pub fn crop(&self, rect: Rect) -> Frame {
        let r = rect.intersection(&self.bounds());
        if r.is_empty() {
            return Frame::new(Vec::new(), 0, 0, self.channels, self.index);
        }
        let (x0, y0) = (r.x as usize, r.y as usize);
        let (x1, y1) = (r.right() as usize, r.bottom() as usize);
        let data: Vec<u8> = self
            .as_ndarray()
            .slice(s![y0..y1, x0..x1, ..])
            .iter()
            .copied()
            .collect();
        Frame::new(data, r.width as u32, r.height as u32, self.channels, self.index)
    }

    /// Copies `patch` into this frame with its top-left corner at `origin`.
    /// Parts of the patch falling outside the frame are dropped.
    pub fn paste(&mut self, patch: &Frame, origin: (i32, i32)) {
        debug_assert_eq!(patch.channels, self.channels);
        let target = Rect::new(origin.0, origin.1, patch.width as i32, patch.height as i32)
            .intersection(&self.bounds());
        if target.is_empty() {
            return;
        }
        let (px, py) = ((target.x - origin.0) as usize, (target.y - origin.1) as usize);
        let (w, h) = (target.width as usize, target.height as usize);
        let src = patch.as_ndarray();
        let src = src.slice(s![py..py + h, px..px + w, ..]);
        let (tx, ty) = (target.x as usize, target.y as usize);
        self.as_ndarray_mut()
            .slice_mut(s![ty..ty + h, tx..tx + w, ..])
            .assign(&src);
    }

    /// Bilinear resize, used to bring camera frames down to working resolution.
    pub fn resized(&self, width: u32, height: u32) -> Result<Frame, FrameError> {
        if self.channels != 3 {
            return Err(FrameError::UnsupportedChannels(self.channels));
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        let expected = (self.width as usize) * (self.height as usize) * 3;
        let img = image::RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            FrameError::BufferSize {
                expected,
                actual: self.data.len(),
            },
        )?;
        let out = image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);
        Ok(Frame::new(out.into_raw(), width, height, 3, self.index))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
