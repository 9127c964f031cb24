use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::PassPhotoError;
use crate::geometry::GeometryConfig;

/// Minimum corpus size before a learned profile is trusted at all.
const MIN_PROFILE_SAMPLES: u32 = 5;

/// Per-key spread limit. A ratio whose corpus standard deviation exceeds
/// this is too scattered to override the fixed heuristic.
const MAX_PROFILE_STDDEV: f64 = 0.10;

/// Plausibility window for the learned head-top position.
const HEAD_TOP_RATIO_MAX: f64 = 0.35;

/// Plausibility window for the learned horizontal face center.
const CENTER_X_RATIO_MIN: f64 = 0.35;
const CENTER_X_RATIO_MAX: f64 = 0.65;

/// One set of per-ratio values, used for both means and standard
/// deviations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileStats {
    /// Head-top-to-shoulder span over sample image height.
    pub head_height_ratio: f64,
    /// Face center X over sample image width.
    pub face_center_x_ratio: f64,
    /// Head-top ordinate over sample image height.
    pub head_top_y_ratio: f64,
}

/// Statistical summary of a corpus of known-good sample photos, produced
/// offline and loaded read-only at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedProfile {
    /// Per-ratio corpus means.
    pub mean: ProfileStats,
    /// Per-ratio corpus standard deviations.
    pub std_dev: ProfileStats,
    /// Number of samples behind the statistics.
    pub sample_size: u32,
}

impl LearnedProfile {
    /// Parse a profile document, rejecting malformed statistics.
    pub fn from_json(json: &str) -> Result<Self, PassPhotoError> {
        let profile: LearnedProfile =
            serde_json::from_str(json).map_err(|e| PassPhotoError::Profile(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), PassPhotoError> {
        let values = [
            self.mean.head_height_ratio,
            self.mean.face_center_x_ratio,
            self.mean.head_top_y_ratio,
            self.std_dev.head_height_ratio,
            self.std_dev.face_center_x_ratio,
            self.std_dev.head_top_y_ratio,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(PassPhotoError::Profile(
                "statistics must be finite and non-negative".to_string(),
            ));
        }
        if self.mean.head_height_ratio <= 0.0 {
            return Err(PassPhotoError::Profile(
                "mean head_height_ratio must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Learned-profile availability, resolved once at load time.
///
/// `Unavailable` is a fully supported state, not an error. With it the crop
/// planner runs on the fixed heuristics, byte-identical to a processor that
/// never saw a profile.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileState {
    /// A validated profile that may adjust crop targets.
    Loaded(LearnedProfile),
    /// No usable profile; fixed heuristics apply.
    Unavailable,
}

impl ProfileState {
    /// Load a profile from a JSON file, degrading to `Unavailable` on any
    /// problem: missing file, malformed JSON, bad statistics, or a corpus
    /// below the sample minimum. Degradation is logged, never fatal.
    pub fn load(path: impl AsRef<Path>) -> ProfileState {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                warn!(
                    "learned profile {} not loaded: {e}; using fixed heuristics",
                    path.display()
                );
                return ProfileState::Unavailable;
            }
        };
        match LearnedProfile::from_json(&json) {
            Ok(profile) if profile.sample_size >= MIN_PROFILE_SAMPLES => {
                debug!(
                    "learned profile {} loaded from {} samples",
                    path.display(),
                    profile.sample_size
                );
                ProfileState::Loaded(profile)
            }
            Ok(profile) => {
                warn!(
                    "learned profile {} has {} samples, below the minimum of {}; using fixed heuristics",
                    path.display(),
                    profile.sample_size,
                    MIN_PROFILE_SAMPLES
                );
                ProfileState::Unavailable
            }
            Err(e) => {
                warn!(
                    "learned profile {} is invalid: {e}; using fixed heuristics",
                    path.display()
                );
                ProfileState::Unavailable
            }
        }
    }

    /// Resolve crop targets for one call.
    ///
    /// Returns the targets plus whether a profile actually adjusted them.
    /// Each ratio is substituted independently; a key whose corpus spread
    /// is too wide keeps its fixed value.
    pub(crate) fn crop_targets(&self, config: GeometryConfig) -> (CropTargets, bool) {
        let fixed = CropTargets::fixed(config);
        let profile = match self {
            ProfileState::Loaded(profile) if profile.sample_size >= MIN_PROFILE_SAMPLES => profile,
            ProfileState::Loaded(profile) => {
                warn!(
                    "learned profile has {} samples, below the minimum of {}; using fixed heuristics",
                    profile.sample_size, MIN_PROFILE_SAMPLES
                );
                return (fixed, false);
            }
            ProfileState::Unavailable => return (fixed, false),
        };

        let head_height_ratio = substitute(
            "head_height_ratio",
            profile
                .mean
                .head_height_ratio
                .clamp(config.head_height_min, config.head_height_max),
            profile.std_dev.head_height_ratio,
            fixed.head_height_ratio,
        );
        let head_top_ratio = substitute(
            "head_top_y_ratio",
            profile.mean.head_top_y_ratio.clamp(0.0, HEAD_TOP_RATIO_MAX),
            profile.std_dev.head_top_y_ratio,
            fixed.head_top_ratio,
        );
        let center_x_ratio = substitute(
            "face_center_x_ratio",
            profile
                .mean
                .face_center_x_ratio
                .clamp(CENTER_X_RATIO_MIN, CENTER_X_RATIO_MAX),
            profile.std_dev.face_center_x_ratio,
            fixed.center_x_ratio,
        );

        (
            CropTargets {
                head_height_ratio,
                head_top_ratio,
                center_x_ratio,
            },
            true,
        )
    }
}

/// Substitute a learned mean for the fixed value unless the corpus spread
/// marks the key unreliable.
fn substitute(key: &str, mean: f64, std_dev: f64, fixed: f64) -> f64 {
    if std_dev > MAX_PROFILE_STDDEV {
        warn!("learned {key} ignored: std_dev {std_dev:.3} exceeds {MAX_PROFILE_STDDEV}");
        return fixed;
    }
    mean
}

/// Target ratios the crop planner aims for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CropTargets {
    /// Head span over crop size.
    pub head_height_ratio: f64,
    /// Head-top position from the crop top, fraction of crop size.
    pub head_top_ratio: f64,
    /// Face center X position, fraction of crop size.
    pub center_x_ratio: f64,
}

impl CropTargets {
    /// Fixed-heuristic targets: face centered, span at the configured
    /// target, head top near the upper edge.
    pub fn fixed(config: GeometryConfig) -> Self {
        Self {
            head_height_ratio: config.target_head_height,
            head_top_ratio: config.head_top_offset,
            center_x_ratio: 0.5,
        }
    }
}
