use std::collections::VecDeque;

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::convex_hull;
use imageproc::morphology::{close, dilate, open};
use imageproc::point::Point;
use log::{debug, warn};

/// Smallest image side the segmentation strategies will attempt.
const MIN_SEGMENTABLE_SIDE: u32 = 16;

/// Border band sampled for backdrop color statistics, in pixels.
const BORDER_BAND: u32 = 2;

/// Flood tolerance bounds around the adaptive `2.5 x stddev` estimate,
/// in channel-distance units.
const FLOOD_TOLERANCE_MIN: f64 = 18.0;
const FLOOD_TOLERANCE_MAX: f64 = 72.0;

/// Canny thresholds for the edge-contour fallback.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Gaussian sigma used to feather mask edges before compositing.
const FEATHER_SIGMA: f32 = 1.5;

/// A believable subject mask covers this fraction range of the frame.
const FOREGROUND_MIN_FRACTION: f64 = 0.20;
const FOREGROUND_MAX_FRACTION: f64 = 0.95;

/// Central window, as a fraction of each side, that must be mostly
/// subject. The crop planner has already centered the face there.
const CENTER_WINDOW_FRACTION: f64 = 0.20;
const CENTER_FOREGROUND_MIN: f64 = 0.50;

type Strategy = fn(&RgbImage) -> Option<GrayImage>;

/// Segmentation methods in preference order. Each yields a foreground mask
/// (255 = subject) that must still pass [`mask_is_plausible`].
const STRATEGIES: [(&str, Strategy); 2] = [
    ("border-flood", segment_border_flood),
    ("edge-contour", segment_edge_contour),
];

/// What background removal did to a crop.
pub(crate) struct BackgroundOutcome {
    /// The crop, with the backdrop replaced when a method succeeded.
    pub image: RgbImage,
    /// Whether any method actually replaced the backdrop.
    pub removed: bool,
    /// Whether the primary method was rejected or every method failed.
    pub degraded: bool,
}

/// Replace the backdrop with white using the first strategy that yields a
/// plausible mask.
///
/// Exhaustion returns the input unchanged; this stage degrades, it never
/// fails the pipeline.
pub(crate) fn remove_background(image: &RgbImage) -> BackgroundOutcome {
    for (index, (name, segment)) in STRATEGIES.iter().enumerate() {
        let Some(mask) = segment(image) else {
            debug!("segmentation method {name} produced no mask");
            continue;
        };
        if !mask_is_plausible(&mask) {
            debug!("segmentation method {name} rejected by the plausibility check");
            continue;
        }

        let degraded = index > 0;
        if degraded {
            warn!("primary segmentation rejected; backdrop removed via {name}");
        }
        return BackgroundOutcome {
            image: composite_over_white(image, &mask),
            removed: true,
            degraded,
        };
    }

    warn!("all segmentation methods failed; leaving the backdrop untouched");
    BackgroundOutcome {
        image: image.clone(),
        removed: false,
        degraded: true,
    }
}

/// Backdrop segmentation by flood fill: estimate the backdrop color from
/// the border band, then flood inward over pixels within tolerance of it.
/// The subject is whatever the flood cannot reach.
fn segment_border_flood(image: &RgbImage) -> Option<GrayImage> {
    let (width, height) = image.dimensions();
    if width < MIN_SEGMENTABLE_SIDE || height < MIN_SEGMENTABLE_SIDE {
        return None;
    }

    let (mean, stddev) = border_stats(image);
    let tolerance = (2.5 * stddev).clamp(FLOOD_TOLERANCE_MIN, FLOOD_TOLERANCE_MAX);
    let tolerance_sq = tolerance * tolerance;

    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;
    let matches_backdrop =
        |x: u32, y: u32| color_distance_sq(image.get_pixel(x, y), mean) <= tolerance_sq;

    let mut background = vec![false; (width as usize) * (height as usize)];
    let mut queue = VecDeque::new();

    for x in 0..width {
        for y in [0, height - 1] {
            if !background[index(x, y)] && matches_backdrop(x, y) {
                background[index(x, y)] = true;
                queue.push_back((x, y));
            }
        }
    }
    for y in 0..height {
        for x in [0, width - 1] {
            if !background[index(x, y)] && matches_backdrop(x, y) {
                background[index(x, y)] = true;
                queue.push_back((x, y));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        let neighbors = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbors {
            if nx >= width || ny >= height {
                continue;
            }
            if !background[index(nx, ny)] && matches_backdrop(nx, ny) {
                background[index(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    let mut mask = GrayImage::new(width, height);
    for (x, y, pixel) in mask.enumerate_pixels_mut() {
        *pixel = if background[index(x, y)] {
            Luma([0])
        } else {
            Luma([255])
        };
    }
    Some(tidy_mask(mask))
}

/// Mean and pooled standard deviation of the border-band pixels.
fn border_stats(image: &RgbImage) -> ([f64; 3], f64) {
    let (width, height) = image.dimensions();
    let band = BORDER_BAND.min(width / 2).min(height / 2).max(1);

    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];
    let mut count = 0.0f64;
    for (x, y, pixel) in image.enumerate_pixels() {
        let on_border = x < band || y < band || x >= width - band || y >= height - band;
        if !on_border {
            continue;
        }
        for channel in 0..3 {
            let value = pixel.0[channel] as f64;
            sum[channel] += value;
            sum_sq[channel] += value * value;
        }
        count += 1.0;
    }

    let mean = [sum[0] / count, sum[1] / count, sum[2] / count];
    let variance = (0..3)
        .map(|c| sum_sq[c] / count - mean[c] * mean[c])
        .sum::<f64>()
        / 3.0;
    (mean, variance.max(0.0).sqrt())
}

fn color_distance_sq(pixel: &Rgb<u8>, reference: [f64; 3]) -> f64 {
    (0..3)
        .map(|c| {
            let d = pixel.0[c] as f64 - reference[c];
            d * d
        })
        .sum()
}

/// Edge-based fallback for multi-tone backdrops the flood cannot model:
/// the subject is the convex hull of the largest edge contour, filled.
/// The hull stays solid even when the traced outline is open, as when
/// the torso runs off the frame edge or one flank is low-contrast.
fn segment_edge_contour(image: &RgbImage) -> Option<GrayImage> {
    let (width, height) = image.dimensions();
    if width < MIN_SEGMENTABLE_SIDE || height < MIN_SEGMENTABLE_SIDE {
        return None;
    }

    // canny applies its own gaussian smoothing
    let gray = image::imageops::grayscale(image);
    let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);
    let connected = dilate(&edges, Norm::LInf, 1);

    let contours: Vec<Contour<i32>> = find_contours(&connected);
    let mut hull = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 3)
        .map(|c| convex_hull(c.points.as_slice()))
        .max_by(|a, b| {
            polygon_area(a)
                .partial_cmp(&polygon_area(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

    if hull.first() == hull.last() {
        // draw_polygon_mut rejects an explicitly closed ring
        hull.pop();
    }
    if hull.len() < 3 {
        return None;
    }

    let mut mask = GrayImage::new(width, height);
    draw_polygon_mut(&mut mask, &hull, Luma([255]));
    Some(tidy_mask(mask))
}

/// Shoelace area of a pixel polygon.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut doubled = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        doubled += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    doubled.abs() / 2.0
}

/// Morphological cleanup plus edge feathering, shared by all strategies.
fn tidy_mask(mask: GrayImage) -> GrayImage {
    let closed = close(&mask, Norm::LInf, 2);
    let opened = open(&closed, Norm::LInf, 2);
    gaussian_blur_f32(&opened, FEATHER_SIGMA)
}

/// Quality gate shared by all strategies: a believable subject mask is
/// neither a sliver nor the whole frame, and the image center is subject.
fn mask_is_plausible(mask: &GrayImage) -> bool {
    let (width, height) = mask.dimensions();
    let total = width as f64 * height as f64;

    let foreground = mask.pixels().filter(|p| p.0[0] >= 128).count() as f64;
    let fraction = foreground / total;
    if !(FOREGROUND_MIN_FRACTION..=FOREGROUND_MAX_FRACTION).contains(&fraction) {
        return false;
    }

    let window_w = ((width as f64 * CENTER_WINDOW_FRACTION) as u32).max(1);
    let window_h = ((height as f64 * CENTER_WINDOW_FRACTION) as u32).max(1);
    let x0 = (width - window_w) / 2;
    let y0 = (height - window_h) / 2;
    let mut center_foreground = 0u32;
    for y in y0..y0 + window_h {
        for x in x0..x0 + window_w {
            if mask.get_pixel(x, y).0[0] >= 128 {
                center_foreground += 1;
            }
        }
    }
    center_foreground as f64 / (window_w as f64 * window_h as f64) >= CENTER_FOREGROUND_MIN
}

/// Composite the subject over a white backdrop, mask value as alpha.
fn composite_over_white(image: &RgbImage, mask: &GrayImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let alpha = mask.get_pixel(x, y).0[0] as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let [r, g, b] = pixel.0;
        out.put_pixel(
            x,
            y,
            Rgb([
                (r as f32 * alpha + 255.0 * inv_alpha).round() as u8,
                (g as f32 * alpha + 255.0 * inv_alpha).round() as u8,
                (b as f32 * alpha + 255.0 * inv_alpha).round() as u8,
            ]),
        );
    }
    out
}
