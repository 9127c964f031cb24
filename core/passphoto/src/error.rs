use thiserror::Error;

/// Errors that abort a single processing call.
///
/// Business rejections (no face, multiple faces) are not errors; they come
/// back through [`crate::ComplianceReport`].
#[derive(Debug, Error)]
pub enum PassPhotoError {
    /// Input bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Decoded image has a zero width or height.
    #[error("image dimensions are zero")]
    ZeroDimensions,

    /// Face box is degenerate or lies outside the image.
    #[error("invalid face geometry: {0}")]
    Geometry(String),

    /// Final JPEG encoding failed.
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// Learned-profile document is malformed or statistically invalid.
    #[error("invalid learned profile: {0}")]
    Profile(String),

    /// Face detection model could not be loaded.
    #[error("failed to load face detection model: {0}")]
    ModelLoad(String),
}
