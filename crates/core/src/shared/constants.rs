use std::time::Duration;

/// Number of faces tracked and swapped at once.
pub const NUM_FACES: usize = 2;

/// Width of the downscaled frame the tracker works on. Height follows the
/// camera's aspect ratio.
pub const WORKING_FRAME_WIDTH: u32 = 256;

/// Longest stretch a face slot may survive on template matching alone.
pub const TEMPLATE_FALLBACK_MAX_DURATION: Duration = Duration::from_secs(2);

/// Full-frame search bounds, as fractions of the working frame height.
pub const SEARCH_MIN_FACE_FRACTION: f64 = 1.0 / 5.0;
pub const SEARCH_MAX_FACE_FRACTION: f64 = 2.0 / 3.0;

/// Re-detection bounds inside a ROI, as fractions of the ROI side.
pub const ROI_MIN_FACE_FRACTION: f64 = 0.4;
pub const ROI_MAX_FACE_FRACTION: f64 = 0.6;

/// Pixels added around the two faces when cutting the compositing sub-frame.
pub const SWAP_MARGIN: i32 = 50;

/// Feather radius is jaw width divided by this.
pub const FEATHER_DIVISOR: i32 = 8;

/// Points per face in the canonical 68-landmark layout.
pub const LANDMARK_COUNT: usize = 68;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
