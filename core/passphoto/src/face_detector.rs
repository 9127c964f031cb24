//! Face detection seam.
//!
//! The pipeline never runs face detection itself. Callers run a detector
//! (the optional built-in [`crate::RustfaceDetector`] or their own backend)
//! and hand the result in, so detection cost is paid once even when an
//! image is evaluated and processed in the same request.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned face bounding box in source-image pixel coordinates.
///
/// Detector boxes cover roughly eyebrow to chin; hair and shoulders are
/// extrapolated downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    /// X coordinate of the top-left corner, in pixels.
    pub x: u32,
    /// Y coordinate of the top-left corner, in pixels.
    pub y: u32,
    /// Box width in pixels.
    pub width: u32,
    /// Box height in pixels.
    pub height: u32,
}

impl FaceBox {
    /// Box from its top-left corner and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Horizontal center of the box, fractional pixels.
    pub fn center_x(&self) -> f64 {
        self.x as f64 + self.width as f64 / 2.0
    }
}

/// Detected eye centers in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePositions {
    /// Left eye center `(x, y)`, the leftmost eye as seen in the image.
    pub left: (f64, f64),
    /// Right eye center `(x, y)`.
    pub right: (f64, f64),
}

/// One face returned by a detector backend.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    /// Face bounding box.
    pub bbox: FaceBox,
    /// Eye centers, when the backend localizes them.
    pub eyes: Option<EyePositions>,
    /// Detection score on the backend's own scale.
    pub confidence: f64,
}

/// Output of one detection pass over an image.
#[derive(Debug, Clone, Default)]
pub struct FaceDetection {
    /// All faces found, in backend order.
    pub faces: Vec<DetectedFace>,
}

/// Width and height of a source image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Dimensions of a decoded image.
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Pluggable face detection backend.
///
/// Backends consume a row-major 8-bit grayscale buffer and report faces in
/// that buffer's pixel coordinates. Implementations must be shareable
/// across threads; the pipeline holds detectors behind `&dyn`.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a `width` x `height` grayscale buffer.
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<DetectedFace>;
}

/// Run a detector over a decoded image.
///
/// Converts to grayscale and hands the raw buffer to the backend. Returned
/// coordinates are in the image's own pixel space, so they can be passed
/// straight to [`crate::PhotoProcessor::process`] with the same image.
pub fn detect_faces(image: &DynamicImage, detector: &dyn FaceDetector) -> FaceDetection {
    let gray = image::imageops::grayscale(image);
    let faces = detector.detect(gray.as_raw(), gray.width(), gray.height());
    FaceDetection { faces }
}
