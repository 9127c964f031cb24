//! Passport-photo compliance checking and cropping.
//!
//! Takes a decoded portrait plus an externally produced face-detection
//! result, judges it against passport framing rules (head height,
//! horizontal centering, eye placement), and renders a 600x600 JPEG at
//! 300 DPI with the head framed the way the rules require. Background
//! replacement and learned-profile crop adjustment are optional stages.
//!
//! Face detection is pluggable through [`FaceDetector`]; the optional
//! `rustface` feature provides a built-in SeetaFace backend.
//!
//! # Example
//!
//! ```no_run
//! use passphoto::{detect_faces, PhotoProcessor, ProcessOptions, ProcessOutcome};
//!
//! # fn run(detector: &dyn passphoto::FaceDetector) -> Result<(), passphoto::PassPhotoError> {
//! let input = std::fs::read("portrait.jpg").unwrap();
//! let image = image::load_from_memory(&input).unwrap();
//! let detection = detect_faces(&image, detector);
//!
//! let processor = PhotoProcessor::new();
//! match processor.process(&input, &detection, ProcessOptions::default())? {
//!     ProcessOutcome::Processed(photo) => std::fs::write("passport.jpg", &photo.data).unwrap(),
//!     ProcessOutcome::Rejected(report) => eprintln!("rejected: {:?}", report.error),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod background;
mod compliance;
mod crop;
mod error;
pub mod face_detector;
mod geometry;
mod jfif;
mod profile;
mod render;
#[cfg(feature = "rustface")]
mod rustface_backend;

use image::{DynamicImage, RgbImage};
use log::debug;

/// Compliance verdict produced for every request.
pub use compliance::ComplianceReport;
/// Error type returned by passphoto operations.
pub use error::PassPhotoError;
/// Detection types, re-exported for convenience.
pub use face_detector::{
    detect_faces, DetectedFace, EyePositions, FaceBox, FaceDetection, FaceDetector,
    ImageDimensions,
};
/// Head-geometry tuning constants, passed by value.
pub use geometry::GeometryConfig;
/// Learned-profile statistics and their availability state.
pub use profile::{LearnedProfile, ProfileState, ProfileStats};
/// Built-in SeetaFace detector backend, behind the `rustface` feature.
#[cfg(feature = "rustface")]
pub use rustface_backend::RustfaceDetector;

/// Side length of the rendered output in pixels.
pub const OUTPUT_SIZE: u32 = render::OUTPUT_SIZE;

/// Print density stamped into the rendered JPEG, dots per inch.
pub const OUTPUT_DPI: u16 = render::OUTPUT_DPI;

/// Per-call pipeline switches.
///
/// Plain data passed by value into [`PhotoProcessor::process`]; there is no
/// hidden per-processor mode, so equal inputs give byte-identical outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Replace the backdrop with white before rendering.
    pub remove_background: bool,
    /// Let a loaded learned profile adjust the crop targets.
    pub use_learned_profile: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            remove_background: false,
            use_learned_profile: true,
        }
    }
}

/// Finished passport photo plus the diagnostics that shaped it.
#[derive(Debug, Clone)]
pub struct ProcessedPhoto {
    /// Encoded JPEG bytes, [`OUTPUT_SIZE`] square at [`OUTPUT_DPI`].
    pub data: Vec<u8>,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// The compliance verdict for the source image.
    pub compliance: ComplianceReport,
    /// Whether a segmentation method actually replaced the backdrop.
    pub background_removed: bool,
    /// Whether background removal fell back to a secondary method or gave
    /// up entirely.
    pub segmentation_degraded: bool,
}

/// Outcome of a processing call that did not hard-fail.
///
/// Face-count problems are answers, not errors: they carry the same
/// compliance report a plain evaluation would return.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Exactly one face: a photo was produced. Check `compliance.valid`
    /// before accepting it.
    Processed(ProcessedPhoto),
    /// Zero or multiple faces: no crop exists, only the verdict.
    Rejected(ComplianceReport),
}

impl ProcessOutcome {
    /// The compliance report, whichever way the call went.
    pub fn compliance(&self) -> &ComplianceReport {
        match self {
            ProcessOutcome::Processed(photo) => &photo.compliance,
            ProcessOutcome::Rejected(report) => report,
        }
    }
}

/// Reusable passport-photo pipeline.
///
/// Captures the geometry tuning and the learned profile at construction;
/// an instance is immutable afterwards and safe to share across threads.
///
/// ```
/// use passphoto::{GeometryConfig, PhotoProcessor, ProfileState};
///
/// let processor = PhotoProcessor::new()
///     .geometry(GeometryConfig::default())
///     .profile(ProfileState::Unavailable);
/// ```
#[derive(Debug, Clone)]
pub struct PhotoProcessor {
    geometry: GeometryConfig,
    profile: ProfileState,
}

impl PhotoProcessor {
    /// Processor with default geometry and no learned profile.
    pub fn new() -> Self {
        Self {
            geometry: GeometryConfig::default(),
            profile: ProfileState::Unavailable,
        }
    }

    /// Override the head-geometry tuning constants.
    pub fn geometry(mut self, config: GeometryConfig) -> Self {
        self.geometry = config;
        self
    }

    /// Attach a learned profile, typically from [`ProfileState::load`].
    pub fn profile(mut self, profile: ProfileState) -> Self {
        self.profile = profile;
        self
    }

    /// Judge a detection result without producing an image.
    pub fn evaluate(
        &self,
        detection: &FaceDetection,
        dims: ImageDimensions,
    ) -> Result<ComplianceReport, PassPhotoError> {
        compliance::evaluate(detection, dims, self.geometry)
    }

    /// Run the full pipeline over encoded image bytes.
    ///
    /// Zero or multiple faces come back as [`ProcessOutcome::Rejected`]. A
    /// single face always yields a photo, whether or not the verdict is
    /// valid, so callers can show the result alongside the issues. Hard
    /// errors are limited to undecodable input, degenerate face geometry,
    /// and encoder failures.
    pub fn process(
        &self,
        input: &[u8],
        detection: &FaceDetection,
        options: ProcessOptions,
    ) -> Result<ProcessOutcome, PassPhotoError> {
        let decoded =
            image::load_from_memory(input).map_err(|e| PassPhotoError::Decode(e.to_string()))?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(PassPhotoError::ZeroDimensions);
        }
        let dims = ImageDimensions::of(&decoded);

        let report = compliance::evaluate(detection, dims, self.geometry)?;
        let face = match detection.faces.as_slice() {
            [face] => face,
            _ => return Ok(ProcessOutcome::Rejected(report)),
        };

        let head = geometry::estimate(&face.bbox, dims, self.geometry)?;
        let (targets, profile_applied) = if options.use_learned_profile {
            self.profile.crop_targets(self.geometry)
        } else {
            (profile::CropTargets::fixed(self.geometry), false)
        };
        if profile_applied {
            debug!("crop targets adjusted by the learned profile");
        }

        let rect = crop::plan(&head, &targets, dims);
        let cropped = flatten_to_rgb(&decoded.crop_imm(rect.x, rect.y, rect.size, rect.size));
        debug!(
            "cropping {}x{} at ({}, {}) from a {}x{} source",
            rect.size, rect.size, rect.x, rect.y, dims.width, dims.height
        );

        let (subject, background_removed, segmentation_degraded) = if options.remove_background {
            let outcome = background::remove_background(&cropped);
            (outcome.image, outcome.removed, outcome.degraded)
        } else {
            (cropped, false, false)
        };

        let data = render::render_jpeg(&subject)?;

        Ok(ProcessOutcome::Processed(ProcessedPhoto {
            data,
            width: render::OUTPUT_SIZE,
            height: render::OUTPUT_SIZE,
            compliance: report,
            background_removed,
            segmentation_degraded,
        }))
    }
}

impl Default for PhotoProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten any alpha onto white; passport output is opaque RGB.
fn flatten_to_rgb(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        rgb.put_pixel(
            x,
            y,
            image::Rgb([
                (r as f32 * alpha + 255.0 * inv_alpha).round() as u8,
                (g as f32 * alpha + 255.0 * inv_alpha).round() as u8,
                (b as f32 * alpha + 255.0 * inv_alpha).round() as u8,
            ]),
        );
    }
    rgb
}
