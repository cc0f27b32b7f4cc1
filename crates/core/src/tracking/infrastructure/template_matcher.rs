use std::sync::Arc;

use ndarray::{s, Array2, ArrayView3, Axis, Zip};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::shared::frame::Frame;

/// Best placement of a template inside a search image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateMatch {
    /// Top-left corner of the template at the best placement.
    pub x: i32,
    pub y: i32,
    /// Min-max normalized score at that placement; 0.0 is the best possible.
    pub score: f64,
}

/// Locates `template` in `image` by normalized squared difference, summed
/// over all channels.
///
/// Returns `None` when the template is empty or does not fit inside the
/// image. Ties resolve to the first placement in row-major order.
pub fn match_template(image: &Frame, template: &Frame) -> Option<TemplateMatch> {
    if template.is_empty() || image.channels() != template.channels() {
        return None;
    }
    if template.width() > image.width() || template.height() > image.height() {
        return None;
    }

    let scores = sqdiff_normed(image.as_ndarray(), template.as_ndarray());
    let normalized = normalize_min_max(scores);

    let mut best: Option<TemplateMatch> = None;
    for ((row, col), &score) in normalized.indexed_iter() {
        if best.map_or(true, |b| score < b.score) {
            best = Some(TemplateMatch {
                x: col as i32,
                y: row as i32,
                score,
            });
        }
    }
    best
}

/// Score map of shape `(H - th + 1, W - tw + 1)`.
///
/// `sum (I - T)^2 = sum T^2 + sum I^2 - 2 sum I*T`: window energies come from
/// an integral image, the cross term from a frequency-domain correlation. All
/// three are integers, so the map is exact.
fn sqdiff_normed(image: ArrayView3<'_, u8>, template: ArrayView3<'_, u8>) -> Array2<f64> {
    let (ih, iw, _) = image.dim();
    let (th, tw, _) = template.dim();
    let (rh, rw) = (ih - th + 1, iw - tw + 1);

    let template_energy: i64 = template.iter().map(|&v| (v as i64) * (v as i64)).sum();
    let energy = squared_integral(image);
    let cross = cross_correlation(image, template);

    Array2::from_shape_fn((rh, rw), |(row, col)| {
        let window_energy = energy[[row + th, col + tw]] + energy[[row, col]]
            - energy[[row, col + tw]]
            - energy[[row + th, col]];
        let diff = (template_energy + window_energy - 2 * cross[[row, col]]).max(0);

        let denom = (template_energy as f64 * window_energy as f64).sqrt();
        if denom > f64::EPSILON {
            diff as f64 / denom
        } else if diff == 0 {
            0.0
        } else {
            1.0
        }
    })
}

/// Summed-area table of squared intensities over all channels, with a zero
/// first row and column.
fn squared_integral(image: ArrayView3<'_, u8>) -> Array2<i64> {
    let (h, w, _) = image.dim();
    let mut sums = Array2::<i64>::zeros((h + 1, w + 1));
    for (y, row) in image.outer_iter().enumerate() {
        let mut row_sum = 0i64;
        for (x, px) in row.outer_iter().enumerate() {
            row_sum += px.iter().map(|&v| (v as i64) * (v as i64)).sum::<i64>();
            sums[[y + 1, x + 1]] = sums[[y, x + 1]] + row_sum;
        }
    }
    sums
}

/// `sum image[r + dy, c + dx] * template[dy, dx]` over all channels for every
/// placement that fits. The transform grid is the image size; fitting
/// placements never wrap.
fn cross_correlation(image: ArrayView3<'_, u8>, template: ArrayView3<'_, u8>) -> Array2<i64> {
    let (ih, iw, _) = image.dim();
    let (th, tw, _) = template.dim();
    let zero = Complex::new(0.0, 0.0);

    let mut planner = FftPlanner::<f64>::new();
    let (row_fwd, col_fwd) = (planner.plan_fft_forward(iw), planner.plan_fft_forward(ih));
    let (row_inv, col_inv) = (planner.plan_fft_inverse(iw), planner.plan_fft_inverse(ih));

    let mut spectrum = Array2::from_elem((ih, iw), zero);
    for (image_plane, template_plane) in image
        .axis_iter(Axis(2))
        .zip(template.axis_iter(Axis(2)))
    {
        let mut image_freq = image_plane.mapv(|v| Complex::new(v as f64, 0.0));
        let mut template_freq = Array2::from_elem((ih, iw), zero);
        template_freq
            .slice_mut(s![..th, ..tw])
            .assign(&template_plane.mapv(|v| Complex::new(v as f64, 0.0)));

        fft_2d(&mut image_freq, &row_fwd, &col_fwd);
        fft_2d(&mut template_freq, &row_fwd, &col_fwd);
        Zip::from(&mut spectrum)
            .and(&image_freq)
            .and(&template_freq)
            .for_each(|acc, &i, &t| *acc += i * t.conj());
    }
    fft_2d(&mut spectrum, &row_inv, &col_inv);

    // rustfft does not normalize
    let norm = (ih * iw) as f64;
    spectrum
        .slice(s![..ih - th + 1, ..iw - tw + 1])
        .mapv(|v| (v.re / norm).round() as i64)
}

/// Separable 2D transform: every row, then every column.
fn fft_2d(data: &mut Array2<Complex<f64>>, rows: &Arc<dyn Fft<f64>>, cols: &Arc<dyn Fft<f64>>) {
    transform_lanes(data, Axis(1), rows.as_ref());
    transform_lanes(data, Axis(0), cols.as_ref());
}

fn transform_lanes(data: &mut Array2<Complex<f64>>, axis: Axis, fft: &dyn Fft<f64>) {
    let mut buf = Vec::with_capacity(data.len_of(axis));
    for mut lane in data.lanes_mut(axis) {
        buf.clear();
        buf.extend(lane.iter().copied());
        fft.process(&mut buf);
        for (dst, &src) in lane.iter_mut().zip(buf.iter()) {
            *dst = src;
        }
    }
}

/// Rescales to `[0, 1]`. A flat map becomes all zeros.
fn normalize_min_max(mut scores: Array2<f64>) -> Array2<f64> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range > 0.0 {
        scores.mapv_inplace(|v| (v - min) / range);
    } else {
        scores.fill(0.0);
    }
    scores
}
