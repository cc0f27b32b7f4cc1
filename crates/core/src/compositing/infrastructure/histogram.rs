//! Per-channel histogram specification over masked pixels.

use ndarray::{Axis, Zip};

use crate::shared::frame::Frame;
use crate::shared::mask::Mask;

pub type Histogram = [u32; 256];
pub type LookupTable = [u8; 256];

pub const IDENTITY_LUT: LookupTable = {
    let mut lut = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        lut[i] = i as u8;
        i += 1;
    }
    lut
};

/// One intensity histogram per channel, counting only pixels where `mask`
/// is non-zero.
pub fn masked_histograms(frame: &Frame, mask: &Mask) -> Vec<Histogram> {
    let mut hists = vec![[0u32; 256]; frame.channels() as usize];
    Zip::from(frame.as_ndarray().lanes(Axis(2)))
        .and(&mask.view())
        .for_each(|px, &m| {
            if m != 0 {
                for (hist, &v) in hists.iter_mut().zip(px.iter()) {
                    hist[v as usize] += 1;
                }
            }
        });
    hists
}

/// Running sum normalized by the total count. An empty histogram yields an
/// all-zero CDF.
pub fn normalized_cdf(hist: &Histogram) -> [f64; 256] {
    let mut cdf = [0.0f64; 256];
    let mut running = 0u64;
    for (c, &count) in cdf.iter_mut().zip(hist.iter()) {
        running += count as u64;
        *c = running as f64;
    }
    if running == 0 {
        return [0.0; 256];
    }
    let total = running as f64;
    cdf.iter_mut().for_each(|c| *c /= total);
    cdf
}

/// First index whose CDF value is not less than `value`; 255 when none is.
fn lower_bound(cdf: &[f64; 256], value: f64) -> u8 {
    cdf.partition_point(|&c| c < value).min(255) as u8
}

/// Maps target intensities onto source intensities with the same
/// cumulative rank. Identity when either side has no samples.
///
/// Equal histograms fix every occupied intensity; an empty bin maps to the
/// nearest occupied one below it, or to 0 below the lowest, so the table is
/// only a full identity when all 256 bins are occupied. Masked pixels never sit in an
/// empty bin, so they come back unchanged either way.
pub fn build_lookup_table(source: &Histogram, target: &Histogram) -> LookupTable {
    let source_cdf = normalized_cdf(source);
    let target_cdf = normalized_cdf(target);
    if source_cdf[255] == 0.0 || target_cdf[255] == 0.0 {
        return IDENTITY_LUT;
    }
    let mut lut = [0u8; 256];
    for (entry, &t) in lut.iter_mut().zip(target_cdf.iter()) {
        *entry = lower_bound(&source_cdf, t);
    }
    lut
}

/// Recolors the masked pixels of `target` so that each channel's histogram
/// follows `source`'s over the same mask. Returns the tables used.
pub fn specify_histogram(source: &Frame, target: &mut Frame, mask: &Mask) -> Vec<LookupTable> {
    let source_hists = masked_histograms(source, mask);
    let target_hists = masked_histograms(target, mask);
    let luts: Vec<LookupTable> = source_hists
        .iter()
        .zip(target_hists.iter())
        .map(|(s, t)| build_lookup_table(s, t))
        .collect();

    Zip::from(target.as_ndarray_mut().lanes_mut(Axis(2)))
        .and(&mask.view())
        .for_each(|mut px, &m| {
            if m != 0 {
                for (v, lut) in px.iter_mut().zip(luts.iter()) {
                    *v = lut[*v as usize];
                }
            }
        });
    luts
}
