use ndarray::{Axis, Zip};

use crate::shared::frame::Frame;
use crate::shared::mask::Mask;

/// Fixed-point alpha blend of `overlay` onto `base`:
/// `((255 - m) * base + m * overlay) >> 8` per channel, with one mask value
/// shared by all channels. Pixels where `m == 0` are left untouched.
pub fn alpha_blend(base: &mut Frame, overlay: &Frame, mask: &Mask) {
    debug_assert_eq!(base.size(), overlay.size());
    debug_assert_eq!(base.size(), mask.size());

    Zip::from(base.as_ndarray_mut().lanes_mut(Axis(2)))
        .and(overlay.as_ndarray().lanes(Axis(2)))
        .and(&mask.view())
        .for_each(|mut b, o, &m| {
            if m == 0 {
                return;
            }
            let m = m as u32;
            Zip::from(&mut b).and(&o).for_each(|b, &o| {
                *b = (((255 - m) * *b as u32 + m * o as u32) >> 8) as u8;
            });
        });
}
