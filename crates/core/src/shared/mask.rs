use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, Zip};

use crate::shared::geometry::{Rect, Size};

/// Single-channel 8-bit raster aligned with a frame or sub-frame.
///
/// Binary masks hold 0/255; feathered masks hold the full 0-255 range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pixels: Array2<u8>,
}

impl Mask {
    pub fn new(size: Size) -> Self {
        let (w, h) = (size.width.max(0) as usize, size.height.max(0) as usize);
        Self {
            pixels: Array2::zeros((h, w)),
        }
    }

    pub fn from_array(pixels: Array2<u8>) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.pixels.nrows() as u32
    }

    pub fn size(&self) -> Size {
        Size::new(self.pixels.ncols() as i32, self.pixels.nrows() as i32)
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[[y, x]]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.pixels[[y, x]] = value;
    }

    pub fn view(&self) -> ArrayView2<'_, u8> {
        self.pixels.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, u8> {
        self.pixels.view_mut()
    }

    pub fn count_nonzero(&self) -> usize {
        self.pixels.iter().filter(|&&v| v != 0).count()
    }

    /// Pixel-wise AND.
    pub fn and(&self, other: &Mask) -> Mask {
        let mut out = self.clone();
        Zip::from(&mut out.pixels)
            .and(&other.pixels)
            .for_each(|a, &b| *a &= b);
        out
    }

    /// Pixel-wise OR.
    pub fn or(&self, other: &Mask) -> Mask {
        let mut out = self.clone();
        Zip::from(&mut out.pixels)
            .and(&other.pixels)
            .for_each(|a, &b| *a |= b);
        out
    }

    /// Owned copy of `rect` clipped to the mask.
    pub fn crop(&self, rect: Rect) -> Mask {
        let r = rect.clipped_to(self.size());
        if r.is_empty() {
            return Mask::new(Size::default());
        }
        let (x0, y0) = (r.x as usize, r.y as usize);
        let (x1, y1) = (r.right() as usize, r.bottom() as usize);
        Mask::from_array(self.pixels.slice(s![y0..y1, x0..x1]).to_owned())
    }

    /// Writes `patch` back at `rect.x, rect.y`. `rect` must already be
    /// clipped, as returned alongside [`Mask::crop`].
    pub fn paste(&mut self, patch: &Mask, rect: Rect) {
        let r = rect.clipped_to(self.size());
        if r.is_empty() {
            return;
        }
        debug_assert_eq!(patch.size(), r.size());
        let (x0, y0) = (r.x as usize, r.y as usize);
        let (x1, y1) = (r.right() as usize, r.bottom() as usize);
        self.pixels
            .slice_mut(s![y0..y1, x0..x1])
            .assign(&patch.pixels);
    }
}
