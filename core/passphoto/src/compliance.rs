use serde::{Deserialize, Serialize};

use crate::error::PassPhotoError;
use crate::face_detector::{EyePositions, FaceBox, FaceDetection, ImageDimensions};
use crate::geometry::{self, GeometryConfig};

/// Acceptable mean eye level as a fraction of image height, inclusive.
const EYE_LEVEL_MIN: f64 = 0.25;
const EYE_LEVEL_MAX: f64 = 0.70;

/// Acceptable eye separation as a fraction of face-box width, inclusive.
const EYE_DISTANCE_MIN: f64 = 0.15;
const EYE_DISTANCE_MAX: f64 = 0.60;

/// Maximum vertical offset between the eyes, fraction of face-box height.
const EYE_SYMMETRY_MAX: f64 = 0.08;

/// Central face region both eyes must fall in, fractions of the box.
const EYE_REGION_X_MIN: f64 = 0.05;
const EYE_REGION_X_MAX: f64 = 0.95;
const EYE_REGION_Y_MIN: f64 = 0.05;
const EYE_REGION_Y_MAX: f64 = 0.70;

/// Structured compliance verdict for one detection result.
///
/// Serializes with the field names callers return to clients, so the struct
/// can be embedded in a response body unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Number of faces the detector reported.
    pub faces_detected: usize,
    /// Overall verdict: exactly one face, head height in band, centered.
    pub valid: bool,
    /// The face box, present only when exactly one face was found.
    pub face_bbox: Option<FaceBox>,
    /// Estimated head-top-to-shoulder span over image height.
    pub head_height_percent: f64,
    /// Whether `head_height_percent` falls in the compliant band.
    pub head_height_valid: bool,
    /// Whether the face center is inside the horizontal tolerance.
    pub horizontally_centered: bool,
    /// Number of eye positions the detector supplied, 0 or 2.
    pub eyes_detected: usize,
    /// Source image dimensions.
    pub image_dimensions: ImageDimensions,
    /// Human-readable findings for failed or suspicious checks.
    pub issues: Vec<String>,
    /// Rejection reason when the face count is not exactly one.
    pub error: Option<String>,
}

impl ComplianceReport {
    /// Report for a face count that blocks all further checks.
    fn rejection(faces_detected: usize, dims: ImageDimensions, error: &str) -> Self {
        Self {
            faces_detected,
            valid: false,
            face_bbox: None,
            head_height_percent: 0.0,
            head_height_valid: false,
            horizontally_centered: false,
            eyes_detected: 0,
            image_dimensions: dims,
            issues: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Evaluate passport-photo compliance for one detection result.
///
/// The face count is checked first and short-circuits everything else, so
/// `error` is set only for zero or multiple faces. A single face always
/// produces the full set of geometric checks; failures land in `issues`.
pub(crate) fn evaluate(
    detection: &FaceDetection,
    dims: ImageDimensions,
    config: GeometryConfig,
) -> Result<ComplianceReport, PassPhotoError> {
    match detection.faces.len() {
        0 => return Ok(ComplianceReport::rejection(0, dims, "No face detected")),
        1 => {}
        n => return Ok(ComplianceReport::rejection(n, dims, "Multiple faces detected")),
    }

    let face = &detection.faces[0];
    let head = geometry::estimate(&face.bbox, dims, config)?;

    let head_height_percent = head.span() / dims.height as f64;
    let head_height_valid = head_height_in_band(head_height_percent, config);
    let horizontally_centered = center_within_tolerance(head.face_center_x, dims, config);

    let mut issues = Vec::new();
    if !head_height_valid {
        let direction = if head_height_percent < config.head_height_min {
            "small"
        } else {
            "large"
        };
        issues.push(format!(
            "Head is too {direction} - head and shoulders should span {:.0}-{:.0}% of image height",
            config.head_height_min * 100.0,
            config.head_height_max * 100.0
        ));
    }
    if !horizontally_centered {
        issues.push("Face is not properly centered horizontally".to_string());
    }

    let eyes_detected = match face.eyes {
        Some(eyes) => {
            check_eyes(&eyes, &face.bbox, dims, &mut issues);
            2
        }
        None => 0,
    };

    Ok(ComplianceReport {
        faces_detected: 1,
        valid: head_height_valid && horizontally_centered,
        face_bbox: Some(face.bbox),
        head_height_percent,
        head_height_valid,
        horizontally_centered,
        eyes_detected,
        image_dimensions: dims,
        issues,
        error: None,
    })
}

/// Inclusive at both ends: a ratio exactly on a bound passes.
pub(crate) fn head_height_in_band(ratio: f64, config: GeometryConfig) -> bool {
    ratio >= config.head_height_min && ratio <= config.head_height_max
}

/// Strict comparison: a face sitting exactly at the tolerance is off-center.
pub(crate) fn center_within_tolerance(
    face_center_x: f64,
    dims: ImageDimensions,
    config: GeometryConfig,
) -> bool {
    let offset = (face_center_x - dims.width as f64 / 2.0).abs() / dims.width as f64;
    offset < config.centering_tolerance
}

/// Eye placement checks. Advisory only, they add issues without touching
/// the overall verdict.
fn check_eyes(eyes: &EyePositions, bbox: &FaceBox, dims: ImageDimensions, issues: &mut Vec<String>) {
    let (left_x, left_y) = eyes.left;
    let (right_x, right_y) = eyes.right;
    let face_width = bbox.width as f64;
    let face_height = bbox.height as f64;
    let mean_y = (left_y + right_y) / 2.0;

    let level = mean_y / dims.height as f64;
    if level < EYE_LEVEL_MIN {
        issues.push("Eyes are positioned too high in the image".to_string());
    } else if level > EYE_LEVEL_MAX {
        issues.push("Eyes are positioned too low in the image".to_string());
    }

    let separation = (right_x - left_x).abs() / face_width;
    if separation < EYE_DISTANCE_MIN {
        issues.push("Eyes appear too close together - check face angle".to_string());
    } else if separation > EYE_DISTANCE_MAX {
        issues.push("Eyes appear too far apart - check detection accuracy".to_string());
    }

    if (left_y - right_y).abs() > EYE_SYMMETRY_MAX * face_height {
        issues.push("Eyes are not horizontally aligned - check head tilt".to_string());
    }

    let x_min = bbox.x as f64 + face_width * EYE_REGION_X_MIN;
    let x_max = bbox.x as f64 + face_width * EYE_REGION_X_MAX;
    let y_min = bbox.y as f64 + face_height * EYE_REGION_Y_MIN;
    let y_max = bbox.y as f64 + face_height * EYE_REGION_Y_MAX;
    let x_inside =
        left_x >= x_min && left_x <= x_max && right_x >= x_min && right_x <= x_max;
    let y_inside = mean_y >= y_min && mean_y <= y_max;
    if !(x_inside && y_inside) {
        issues.push("Eyes may be partially obscured or at image edges".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_detector::DetectedFace;

    fn dims(width: u32, height: u32) -> ImageDimensions {
        ImageDimensions { width, height }
    }

    fn detection_of(boxes: &[FaceBox]) -> FaceDetection {
        FaceDetection {
            faces: boxes
                .iter()
                .map(|bbox| DetectedFace {
                    bbox: *bbox,
                    eyes: None,
                    confidence: 10.0,
                })
                .collect(),
        }
    }

    fn with_eyes(bbox: FaceBox, eyes: EyePositions) -> FaceDetection {
        FaceDetection {
            faces: vec![DetectedFace {
                bbox,
                eyes: Some(eyes),
                confidence: 10.0,
            }],
        }
    }

    /// 360px face centered in a 1000px frame: span 594, ratio 0.594.
    fn good_face() -> FaceBox {
        FaceBox::new(320, 250, 360, 360)
    }

    #[test]
    fn no_faces_is_a_rejection() {
        let report = evaluate(&FaceDetection::default(), dims(800, 800), GeometryConfig::default())
            .unwrap();

        assert_eq!(report.faces_detected, 0);
        assert!(!report.valid);
        assert_eq!(report.error.as_deref(), Some("No face detected"));
        assert!(report.face_bbox.is_none());
        assert_eq!(report.head_height_percent, 0.0);
    }

    #[test]
    fn multiple_faces_reject_before_any_geometry() {
        // both faces would individually pass every check
        let detection = detection_of(&[good_face(), FaceBox::new(100, 250, 360, 360)]);
        let report = evaluate(&detection, dims(1000, 1000), GeometryConfig::default()).unwrap();

        assert_eq!(report.faces_detected, 2);
        assert!(!report.valid);
        assert_eq!(report.error.as_deref(), Some("Multiple faces detected"));
        assert!(report.face_bbox.is_none());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn single_good_face_is_valid() {
        let detection = detection_of(&[good_face()]);
        let report = evaluate(&detection, dims(1000, 1000), GeometryConfig::default()).unwrap();

        assert!(report.valid);
        assert!(report.head_height_valid);
        assert!(report.horizontally_centered);
        assert_eq!(report.face_bbox, Some(good_face()));
        assert!(report.error.is_none());
        assert!(report.issues.is_empty());
        assert!((report.head_height_percent - 0.594).abs() < 1e-9);
    }

    #[test]
    fn head_height_band_is_inclusive() {
        let config = GeometryConfig::default();

        assert!(head_height_in_band(0.50, config));
        assert!(head_height_in_band(0.69, config));
        assert!(head_height_in_band(0.60, config));
        assert!(!head_height_in_band(0.499, config));
        assert!(!head_height_in_band(0.691, config));
    }

    #[test]
    fn head_height_bound_holds_through_the_full_path() {
        // 0.25 and 0.75 margins over a 100px face give an exact 200px span,
        // exactly half of the 400px frame
        let config = GeometryConfig {
            head_top_margin: 0.25,
            shoulder_drop: 0.75,
            ..GeometryConfig::default()
        };
        let detection = detection_of(&[FaceBox::new(150, 100, 100, 100)]);
        let report = evaluate(&detection, dims(400, 400), config).unwrap();

        assert_eq!(report.head_height_percent, 0.5);
        assert!(report.head_height_valid);
        assert!(report.valid);
    }

    #[test]
    fn centering_tolerance_is_exclusive() {
        let config = GeometryConfig::default();

        // 1000px frame: center 500, offset 300 is exactly the tolerance
        assert!(!center_within_tolerance(800.0, dims(1000, 1000), config));
        assert!(center_within_tolerance(799.0, dims(1000, 1000), config));
        assert!(!center_within_tolerance(200.0, dims(1000, 1000), config));
        assert!(center_within_tolerance(201.0, dims(1000, 1000), config));
    }

    #[test]
    fn small_head_reports_issue_but_keeps_the_bbox() {
        let detection = detection_of(&[FaceBox::new(379, 300, 242, 242)]);
        let report = evaluate(&detection, dims(1000, 1000), GeometryConfig::default()).unwrap();

        assert!(!report.valid);
        assert!(!report.head_height_valid);
        assert!(report.horizontally_centered);
        assert!(report.face_bbox.is_some());
        assert!(report.error.is_none());
        assert!(report.issues.iter().any(|i| i.contains("too small")));
    }

    #[test]
    fn large_head_reports_issue() {
        let detection = detection_of(&[FaceBox::new(250, 100, 500, 500)]);
        let report = evaluate(&detection, dims(1000, 1000), GeometryConfig::default()).unwrap();

        assert!(!report.head_height_valid);
        assert!(report.issues.iter().any(|i| i.contains("too large")));
    }

    #[test]
    fn off_center_face_reports_issue() {
        let detection = detection_of(&[FaceBox::new(620, 250, 360, 360)]);
        let report = evaluate(&detection, dims(1000, 1000), GeometryConfig::default()).unwrap();

        assert!(!report.horizontally_centered);
        assert!(!report.valid);
        assert!(report
            .issues
            .iter()
            .any(|i| i.contains("centered horizontally")));
    }

    #[test]
    fn degenerate_box_propagates_an_error() {
        let detection = detection_of(&[FaceBox::new(10, 10, 0, 40)]);
        let result = evaluate(&detection, dims(100, 100), GeometryConfig::default());

        assert!(matches!(result, Err(PassPhotoError::Geometry(_))));
    }

    #[test]
    fn well_placed_eyes_add_no_issues() {
        let eyes = EyePositions {
            left: (430.0, 390.0),
            right: (570.0, 390.0),
        };
        let report = evaluate(&with_eyes(good_face(), eyes), dims(1000, 1000), GeometryConfig::default())
            .unwrap();

        assert_eq!(report.eyes_detected, 2);
        assert!(report.issues.is_empty());
        assert!(report.valid);
    }

    #[test]
    fn missing_eyes_are_not_penalized() {
        let detection = detection_of(&[good_face()]);
        let report = evaluate(&detection, dims(1000, 1000), GeometryConfig::default()).unwrap();

        assert_eq!(report.eyes_detected, 0);
        assert!(report.issues.is_empty());
        assert!(report.valid);
    }

    #[test]
    fn low_eyes_are_flagged() {
        // mean eye level 0.75 of the frame height
        let eyes = EyePositions {
            left: (430.0, 750.0),
            right: (570.0, 750.0),
        };
        let report = evaluate(
            &with_eyes(FaceBox::new(320, 500, 360, 360), eyes),
            dims(1000, 1000),
            GeometryConfig::default(),
        )
        .unwrap();

        assert!(report.issues.iter().any(|i| i.contains("too low")));
    }

    #[test]
    fn tilted_eyes_are_flagged() {
        // 40px vertical offset against a 28.8px limit for a 360px face
        let eyes = EyePositions {
            left: (430.0, 380.0),
            right: (570.0, 420.0),
        };
        let report = evaluate(&with_eyes(good_face(), eyes), dims(1000, 1000), GeometryConfig::default())
            .unwrap();

        assert!(report.issues.iter().any(|i| i.contains("not horizontally aligned")));
    }

    #[test]
    fn narrow_eye_separation_is_flagged() {
        // 20px apart on a 360px face, ratio 0.055
        let eyes = EyePositions {
            left: (490.0, 390.0),
            right: (510.0, 390.0),
        };
        let report = evaluate(&with_eyes(good_face(), eyes), dims(1000, 1000), GeometryConfig::default())
            .unwrap();

        assert!(report.issues.iter().any(|i| i.contains("too close together")));
    }

    #[test]
    fn eyes_outside_the_face_region_are_flagged() {
        // left eye sits on the box edge, outside the 5% inset
        let eyes = EyePositions {
            left: (322.0, 390.0),
            right: (570.0, 390.0),
        };
        let report = evaluate(&with_eyes(good_face(), eyes), dims(1000, 1000), GeometryConfig::default())
            .unwrap();

        assert!(report.issues.iter().any(|i| i.contains("obscured")));
    }

    #[test]
    fn report_serializes_with_response_field_names() {
        let detection = detection_of(&[good_face()]);
        let report = evaluate(&detection, dims(1000, 1000), GeometryConfig::default()).unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["faces_detected"], 1);
        assert_eq!(value["valid"], true);
        assert_eq!(value["image_dimensions"]["width"], 1000);
        assert_eq!(value["face_bbox"]["height"], 360);
        assert!(value["error"].is_null());
    }
}
