//! Pixel-level primitives for the swap pipeline: polygon rasterization,
//! nearest-neighbor affine warps and masked copies.

use ndarray::{s, Axis, Zip};

use crate::compositing::domain::affine_transform::AffineTransform;
use crate::shared::frame::Frame;
use crate::shared::geometry::Point;
use crate::shared::mask::Mask;

/// Fills a convex polygon, boundary included, with `value`.
///
/// Each row is filled between the leftmost and rightmost edge crossing, so
/// a non-convex outline is filled as its row-wise hull.
pub fn fill_convex_poly(mask: &mut Mask, points: &[Point], value: u8) {
    if points.is_empty() {
        return;
    }
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let y_min = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let y_max = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    let row_start = (y_min.round() as i32).max(0);
    let row_end = (y_max.round() as i32).min(h - 1);

    let mut view = mask.view_mut();
    for row in row_start..=row_end {
        let Some((lo, hi)) = row_span(points, row as f64) else {
            continue;
        };
        let x0 = (lo.round() as i32).max(0);
        let x1 = (hi.round() as i32).min(w - 1);
        if x0 > x1 {
            continue;
        }
        view.slice_mut(s![row as usize, x0 as usize..=x1 as usize])
            .fill(value);
    }
}

/// Horizontal extent of the polygon's edges at height `y`.
fn row_span(points: &[Point], y: f64) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let n = points.len();

    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        if y < p.y.min(q.y) || y > p.y.max(q.y) {
            continue;
        }
        if p.y == q.y {
            lo = lo.min(p.x.min(q.x));
            hi = hi.max(p.x.max(q.x));
        } else {
            let x = p.x + (y - p.y) * (q.x - p.x) / (q.y - p.y);
            lo = lo.min(x);
            hi = hi.max(x);
        }
    }

    (lo <= hi).then_some((lo, hi))
}

/// Source pixel for destination `(x, y)` under `sample_map`, if in bounds.
fn sample(sample_map: &AffineTransform, x: usize, y: usize, w: usize, h: usize) -> Option<(usize, usize)> {
    let p = sample_map.apply(Point::new(x as f64, y as f64));
    let (sx, sy) = (p.x.round(), p.y.round());
    if sx < 0.0 || sy < 0.0 || sx >= w as f64 || sy >= h as f64 {
        return None;
    }
    Some((sx as usize, sy as usize))
}

/// Nearest-neighbor warp into a same-sized frame, zero-filled outside.
///
/// `sample_map` goes from destination to source coordinates: to move an
/// image by `T`, pass `T`'s inverse.
pub fn warp_frame(src: &Frame, sample_map: &AffineTransform) -> Frame {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let mut out = Frame::black(src.width(), src.height(), src.channels());
    let src_view = src.as_ndarray();
    let mut out_view = out.as_ndarray_mut();

    for (y, mut row) in out_view.axis_iter_mut(Axis(0)).enumerate() {
        for (x, mut px) in row.axis_iter_mut(Axis(0)).enumerate() {
            if let Some((sx, sy)) = sample(sample_map, x, y, w, h) {
                px.assign(&src_view.slice(s![sy, sx, ..]));
            }
        }
    }
    out
}

/// Mask counterpart of [`warp_frame`].
pub fn warp_mask(src: &Mask, sample_map: &AffineTransform) -> Mask {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let src_view = src.view();
    let mut out = Mask::new(src.size());

    for ((y, x), v) in out.view_mut().indexed_iter_mut() {
        if let Some((sx, sy)) = sample(sample_map, x, y, w, h) {
            *v = src_view[[sy, sx]];
        }
    }
    out
}

/// Copies pixels of `src` into `dst` wherever `mask` is non-zero.
pub fn copy_masked(src: &Frame, dst: &mut Frame, mask: &Mask) {
    Zip::from(dst.as_ndarray_mut().lanes_mut(Axis(2)))
        .and(src.as_ndarray().lanes(Axis(2)))
        .and(&mask.view())
        .for_each(|mut d, s, &m| {
            if m != 0 {
                d.assign(&s);
            }
        });
}

/// `src` where `mask` is non-zero, black elsewhere.
pub fn extract_masked(src: &Frame, mask: &Mask) -> Frame {
    let mut out = Frame::black(src.width(), src.height(), src.channels());
    copy_masked(src, &mut out, mask);
    out
}
