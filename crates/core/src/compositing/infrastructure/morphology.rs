use std::ops::Range;

use ndarray::Array2;

use crate::shared::geometry::{Rect, Size};
use crate::shared::mask::Mask;

/// Window of `k` samples around `i` (anchor at `k / 2`), clipped to
/// `[0, len)`. The flag is false when clipping removed any sample.
fn window(i: usize, k: usize, len: usize) -> (Range<usize>, bool) {
    let start = i as isize - (k / 2) as isize;
    let end = start + k as isize;
    let clipped = start.max(0) as usize..(end.min(len as isize)) as usize;
    (clipped, start >= 0 && end <= len as isize)
}

/// Rectangular erosion, one iteration. Pixels outside the mask count as 0,
/// so the mask also shrinks away from its borders.
pub fn erode(mask: &Mask, kernel: Size) -> Mask {
    let (kw, kh) = (kernel.width.max(1) as usize, kernel.height.max(1) as usize);
    let src = mask.view();
    let (h, w) = src.dim();

    let horizontal = Array2::from_shape_fn((h, w), |(y, x)| match window(x, kw, w) {
        (range, true) => range.map(|sx| src[[y, sx]]).min().unwrap_or(0),
        _ => 0,
    });
    let eroded = Array2::from_shape_fn((h, w), |(y, x)| match window(y, kh, h) {
        (range, true) => range.map(|sy| horizontal[[sy, x]]).min().unwrap_or(0),
        _ => 0,
    });
    Mask::from_array(eroded)
}

/// Normalized box filter with zero padding: every output is the mean of a
/// full `kernel`-sized window, rounded to nearest.
pub fn box_blur(mask: &Mask, kernel: Size) -> Mask {
    let (kw, kh) = (kernel.width.max(1) as usize, kernel.height.max(1) as usize);
    let src = mask.view();
    let (h, w) = src.dim();
    let area = (kw * kh) as f64;

    let row_sums = Array2::from_shape_fn((h, w), |(y, x)| {
        window(x, kw, w).0.map(|sx| src[[y, sx]] as u32).sum::<u32>()
    });
    let blurred = Array2::from_shape_fn((h, w), |(y, x)| {
        let total: u32 = window(y, kh, h).0.map(|sy| row_sums[[sy, x]]).sum();
        (total as f64 / area).round().min(255.0) as u8
    });
    Mask::from_array(blurred)
}

/// Softens the mask edge inside `region` only: erode, then box blur, both
/// with a `radius`-sized square kernel. Pixels outside `region` are neither
/// read nor written.
pub fn feather(mask: &mut Mask, region: Rect, radius: i32) {
    let region = region.clipped_to(mask.size());
    if region.is_empty() {
        return;
    }
    let kernel = Size::square(radius.max(1));
    let patch = mask.crop(region);
    let patch = box_blur(&erode(&patch, kernel), kernel);
    mask.paste(&patch, region);
}
