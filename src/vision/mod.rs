//! Spot Locator.
//!
//! Given one observation photo, finds the detected parking spot closest to
//! a fixed reference point: the horizontal midpoint of the (scaled) frame,
//! with the vertical offset measured as the raw row of the box center.
//! Detection itself is delegated to a [`SpotDetector`] backend; heavyweight
//! model state loads once per locator instance and is reused across calls.

mod backend;
mod backends;

pub use backend::SpotDetector;
pub use backends::StubDetector;
#[cfg(feature = "backend-tract")]
pub use backends::TractDetector;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use std::fmt;
use std::path::Path;

use crate::config::VisionSettings;
use crate::geo::PixelOffset;

/// Minimum detection confidence for a candidate spot.
pub const SCORE_THRESHOLD: f32 = 0.8;

/// One candidate object from a single inference call. Boxes are in pixel
/// space of the detector input frame, origin at the top-left corner.
#[derive(Clone, Debug)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub confidence: f32,
    pub class_id: i64,
}

impl Detection {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// The chosen spot: pixel offset from the reference point and its
/// Euclidean norm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotFix {
    pub offset: PixelOffset,
    pub distance: f64,
}

/// No detection of the target class survived the score threshold.
///
/// A typed sentinel so callers can tell "nothing found" apart from
/// infrastructure failures by downcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoSpotFound;

impl fmt::Display for NoSpotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no parking spot detected above the score threshold")
    }
}

impl std::error::Error for NoSpotFound {}

/// What the mission sequencer consumes: one image in, one spot fix out.
pub trait SpotSource {
    fn locate(&mut self, image_path: &Path) -> Result<SpotFix>;
}

/// Closest-spot selection over a pluggable detector backend.
pub struct SpotLocator {
    detector: Box<dyn SpotDetector>,
    settings: VisionSettings,
}

impl SpotLocator {
    pub fn new(detector: Box<dyn SpotDetector>, settings: VisionSettings) -> Self {
        Self { detector, settings }
    }

    /// Detector input size: the capture frame scaled for inference.
    pub fn detect_size(&self) -> (u32, u32) {
        self.settings.detect_size()
    }
}

impl SpotSource for SpotLocator {
    fn locate(&mut self, image_path: &Path) -> Result<SpotFix> {
        let image = image::open(image_path)
            .with_context(|| format!("load capture {}", image_path.display()))?;
        let (width, height) = self.detect_size();
        let rgb = image
            .resize_exact(width, height, FilterType::Triangle)
            .into_rgb8();

        let detections = self
            .detector
            .detect(rgb.as_raw(), width, height)
            .with_context(|| format!("run {} detector", self.detector.name()))?;
        log::info!(
            "{} detector returned {} candidates",
            self.detector.name(),
            detections.len()
        );

        select_closest(
            &detections,
            self.settings.target_class,
            f64::from(width) / 2.0,
        )
    }
}

/// Pick the candidate of `target_class` whose center lies closest to the
/// reference point `(midpoint_x, 0)`. Fails with [`NoSpotFound`] when no
/// candidate survives the class and score filters.
fn select_closest(
    detections: &[Detection],
    target_class: i64,
    midpoint_x: f64,
) -> Result<SpotFix> {
    let mut best: Option<SpotFix> = None;
    for detection in detections
        .iter()
        .filter(|d| d.class_id == target_class && d.confidence >= SCORE_THRESHOLD)
    {
        let (center_x, center_y) = detection.center();
        let offset = PixelOffset {
            horizontal: center_x - midpoint_x,
            vertical: center_y,
        };
        let distance = offset.norm();
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(SpotFix { offset, distance });
        }
    }
    best.ok_or_else(|| anyhow::Error::new(NoSpotFound))
}
