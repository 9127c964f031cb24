//! Face detector backend built on the `rustface` crate (SeetaFace engine).
//!
//! Enabled with the `rustface` feature. The SeetaFace frontal model file is
//! not bundled; pass its path at construction.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;
use log::debug;

use crate::error::PassPhotoError;
use crate::face_detector::{DetectedFace, FaceBox, FaceDetector};

/// Longest image side fed to the detector. Larger inputs are downscaled
/// for detection and the boxes rescaled to source coordinates.
const MAX_DETECTION_SIDE: u32 = 1024;

/// Face detector backed by a SeetaFace frontal model.
///
/// Holds only the parsed model. Each call builds a fresh engine from it,
/// so one instance can serve concurrent callers.
pub struct RustfaceDetector {
    model: rustface::Model,
}

impl RustfaceDetector {
    /// Load a SeetaFace model (e.g. `seeta_fd_frontal_v1.0.bin`) from disk.
    pub fn from_model_path(path: impl AsRef<Path>) -> Result<Self, PassPhotoError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| PassPhotoError::ModelLoad(format!("{}: {e}", path.display())))?;
        let model = rustface::read_model(std::io::Cursor::new(data))
            .map_err(|e| PassPhotoError::ModelLoad(e.to_string()))?;
        Ok(Self { model })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<DetectedFace> {
        let Some(buffer) = GrayImage::from_raw(width, height, gray.to_vec()) else {
            return Vec::new();
        };

        let longest = width.max(height);
        let (scaled, scale) = if longest > MAX_DETECTION_SIDE {
            let scale = MAX_DETECTION_SIDE as f64 / longest as f64;
            let w = ((width as f64 * scale).round() as u32).max(1);
            let h = ((height as f64 * scale).round() as u32).max(1);
            debug!("downscaling {width}x{height} to {w}x{h} for detection");
            (imageops::resize(&buffer, w, h, FilterType::Triangle), scale)
        } else {
            (buffer, 1.0)
        };

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(20);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let image = rustface::ImageData::new(scaled.as_raw(), scaled.width(), scaled.height());
        let faces = detector.detect(&image);
        debug!("rustface reported {} candidate face(s)", faces.len());

        faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                let x = (bbox.x() as f64 / scale).round().max(0.0) as u32;
                let y = (bbox.y() as f64 / scale).round().max(0.0) as u32;
                let w = (bbox.width() as f64 / scale).round() as u32;
                let h = (bbox.height() as f64 / scale).round() as u32;
                if x >= width || y >= height || w == 0 || h == 0 {
                    return None;
                }
                Some(DetectedFace {
                    bbox: FaceBox::new(x, y, w.min(width - x), h.min(height - y)),
                    eyes: None,
                    confidence: face.score(),
                })
            })
            .collect()
    }
}
