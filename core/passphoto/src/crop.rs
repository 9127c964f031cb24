use log::warn;

use crate::face_detector::ImageDimensions;
use crate::geometry::HeadGeometry;
use crate::profile::CropTargets;

/// Square crop region in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CropRect {
    /// X coordinate of the top-left corner, in pixels.
    pub x: u32,
    /// Y coordinate of the top-left corner, in pixels.
    pub y: u32,
    /// Side length in pixels; the crop is always square.
    pub size: u32,
}

/// Plan the square crop that frames the estimated head at the target
/// ratios.
///
/// The side is `span / head_height_ratio` rounded up, so the realized head
/// height lands at or below the target and borderline heads keep their
/// hair. Placement puts the face center at `center_x_ratio` and the head
/// top at `head_top_ratio`, with the vertical origin floored toward extra
/// headroom. A crop that does not fit is translated into bounds per axis,
/// never scaled; a span too large for the image relaxes to the largest
/// square the image holds.
pub(crate) fn plan(head: &HeadGeometry, targets: &CropTargets, dims: ImageDimensions) -> CropRect {
    let max_square = dims.width.min(dims.height);
    let desired = (head.span() / targets.head_height_ratio).ceil();

    let size = if desired > max_square as f64 {
        warn!(
            "ideal crop of {desired:.0}px exceeds the {}x{} source; relaxing to the largest square",
            dims.width, dims.height
        );
        max_square
    } else {
        (desired as u32).max(1)
    };

    let x = (head.face_center_x - size as f64 * targets.center_x_ratio).round();
    let y = (head.head_top - size as f64 * targets.head_top_ratio).floor();

    CropRect {
        x: clamp_origin(x, size, dims.width),
        y: clamp_origin(y, size, dims.height),
        size,
    }
}

/// Shift a crop origin so `origin + size` stays inside the axis extent.
fn clamp_origin(origin: f64, size: u32, extent: u32) -> u32 {
    let max_origin = extent.saturating_sub(size) as f64;
    origin.clamp(0.0, max_origin) as u32
}
