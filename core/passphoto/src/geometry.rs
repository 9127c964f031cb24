use crate::error::PassPhotoError;
use crate::face_detector::{FaceBox, ImageDimensions};

/// Fraction of face-box height assumed to extend above the box, covering
/// hair and forehead the detector does not include.
const HEAD_TOP_MARGIN: f64 = 0.15;

/// Fraction of face-box height added below the chin for the shoulder line.
const SHOULDER_DROP: f64 = 0.5;

/// Head-to-shoulder span over crop size the planner aims for. Sits
/// mid-range of the compliant band.
const TARGET_HEAD_HEIGHT: f64 = 0.6;

/// Head-top position inside the crop, as a fraction of crop size measured
/// from the top edge.
const HEAD_TOP_OFFSET: f64 = 0.12;

/// Compliant head-height band, inclusive at both ends.
const HEAD_HEIGHT_MIN: f64 = 0.50;
const HEAD_HEIGHT_MAX: f64 = 0.69;

/// Maximum horizontal face-center offset from image center, as a fraction
/// of image width. The check is strict, exactly this offset fails.
const CENTERING_TOLERANCE: f64 = 0.30;

/// Tuning constants for head-geometry estimation and the compliance bands.
///
/// Plain data, passed by value. A processor captures one at construction
/// and every stage reads the same copy, so a call never sees a half-updated
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryConfig {
    /// Fraction of face-box height extrapolated above the box for hair.
    pub head_top_margin: f64,
    /// Fraction of face-box height extrapolated below the box for shoulders.
    pub shoulder_drop: f64,
    /// Head-span over crop-size ratio the crop planner targets.
    pub target_head_height: f64,
    /// Head-top position in the crop, fraction of crop size from the top.
    pub head_top_offset: f64,
    /// Lower compliant head-height bound, inclusive.
    pub head_height_min: f64,
    /// Upper compliant head-height bound, inclusive.
    pub head_height_max: f64,
    /// Horizontal centering tolerance, fraction of image width, exclusive.
    pub centering_tolerance: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            head_top_margin: HEAD_TOP_MARGIN,
            shoulder_drop: SHOULDER_DROP,
            target_head_height: TARGET_HEAD_HEIGHT,
            head_top_offset: HEAD_TOP_OFFSET,
            head_height_min: HEAD_HEIGHT_MIN,
            head_height_max: HEAD_HEIGHT_MAX,
            centering_tolerance: CENTERING_TOLERANCE,
        }
    }
}

/// Estimated head extent for one face, in source-image pixel ordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HeadGeometry {
    /// Estimated top of the head (hair included), clamped to the image.
    pub head_top: f64,
    /// Estimated shoulder line, clamped to the image.
    pub shoulder_bottom: f64,
    /// Horizontal face center.
    pub face_center_x: f64,
}

impl HeadGeometry {
    /// Vertical span from head top to shoulder line.
    pub fn span(&self) -> f64 {
        self.shoulder_bottom - self.head_top
    }
}

/// Derive head-top and shoulder-line estimates from a detector box.
///
/// Both ordinates are fixed fractions of the box height away from the box,
/// clamped to the image, so the span can only shrink for faces near the
/// frame edges.
pub(crate) fn estimate(
    bbox: &FaceBox,
    dims: ImageDimensions,
    config: GeometryConfig,
) -> Result<HeadGeometry, PassPhotoError> {
    validate_box(bbox, dims)?;

    let face_height = bbox.height as f64;
    let head_top = (bbox.y as f64 - face_height * config.head_top_margin).max(0.0);
    let shoulder_bottom = (bbox.y as f64 + face_height + face_height * config.shoulder_drop)
        .min(dims.height as f64);

    Ok(HeadGeometry {
        head_top,
        shoulder_bottom,
        face_center_x: bbox.center_x(),
    })
}

fn validate_box(bbox: &FaceBox, dims: ImageDimensions) -> Result<(), PassPhotoError> {
    if bbox.width == 0 || bbox.height == 0 {
        return Err(PassPhotoError::Geometry(format!(
            "face box has zero size: {}x{}",
            bbox.width, bbox.height
        )));
    }
    let right = bbox.x as u64 + bbox.width as u64;
    let bottom = bbox.y as u64 + bbox.height as u64;
    if right > dims.width as u64 || bottom > dims.height as u64 {
        return Err(PassPhotoError::Geometry(format!(
            "face box ({}, {}) {}x{} exceeds image bounds {}x{}",
            bbox.x, bbox.y, bbox.width, bbox.height, dims.width, dims.height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> ImageDimensions {
        ImageDimensions { width, height }
    }

    #[test]
    fn margins_extend_the_box_both_ways() {
        // 100px face at y=200: top = 200 - 15, shoulder = 300 + 50
        let bbox = FaceBox::new(400, 200, 100, 100);
        let geom = estimate(&bbox, dims(1000, 1000), GeometryConfig::default()).unwrap();

        assert!((geom.head_top - 185.0).abs() < 1e-9);
        assert!((geom.shoulder_bottom - 350.0).abs() < 1e-9);
        assert!((geom.face_center_x - 450.0).abs() < 1e-9);
        assert!((geom.span() - 165.0).abs() < 1e-9);
    }

    #[test]
    fn head_top_clamps_to_the_frame() {
        // 5 - 15 would be negative
        let bbox = FaceBox::new(400, 5, 100, 100);
        let geom = estimate(&bbox, dims(1000, 1000), GeometryConfig::default()).unwrap();

        assert_eq!(geom.head_top, 0.0);
    }

    #[test]
    fn shoulder_line_clamps_to_the_frame() {
        // 880 + 100 + 50 would pass the bottom edge
        let bbox = FaceBox::new(400, 880, 100, 100);
        let geom = estimate(&bbox, dims(1000, 1000), GeometryConfig::default()).unwrap();

        assert_eq!(geom.shoulder_bottom, 1000.0);
    }

    #[test]
    fn span_covers_at_least_the_face_box() {
        let bbox = FaceBox::new(10, 0, 80, 100);
        let geom = estimate(&bbox, dims(100, 100), GeometryConfig::default()).unwrap();

        assert!(geom.span() >= 100.0);
    }

    #[test]
    fn zero_sized_box_is_rejected() {
        let bbox = FaceBox::new(10, 10, 0, 50);
        let result = estimate(&bbox, dims(100, 100), GeometryConfig::default());

        assert!(matches!(result, Err(PassPhotoError::Geometry(_))));
    }

    #[test]
    fn out_of_bounds_box_is_rejected() {
        let bbox = FaceBox::new(90, 10, 20, 20);
        let result = estimate(&bbox, dims(100, 100), GeometryConfig::default());

        assert!(matches!(result, Err(PassPhotoError::Geometry(_))));
    }

    #[test]
    fn custom_margins_are_honored() {
        let config = GeometryConfig {
            head_top_margin: 0.25,
            shoulder_drop: 0.75,
            ..GeometryConfig::default()
        };
        let bbox = FaceBox::new(150, 100, 100, 100);
        let geom = estimate(&bbox, dims(400, 400), config).unwrap();

        // exact in f64: 0.25 and 0.75 are powers of two over 100px
        assert_eq!(geom.head_top, 75.0);
        assert_eq!(geom.shoulder_bottom, 275.0);
        assert_eq!(geom.span(), 200.0);
    }
}
