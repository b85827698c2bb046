use anyhow::Result;

use crate::vision::backend::SpotDetector;
use crate::vision::Detection;

/// Stub backend for testing and camera-less targets. Replays a canned
/// detection list on every call.
pub struct StubDetector {
    detections: Vec<Detection>,
}

impl StubDetector {
    pub fn new() -> Self {
        Self {
            detections: Vec::new(),
        }
    }

    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}
