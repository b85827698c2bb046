use anyhow::Result;

use super::Detection;

/// Detector backend trait.
///
/// Implementations own whatever model state they need and must load it
/// once at construction; `detect` is called per image and must not reload
/// configuration. The pixel slice is read-only and ephemeral.
pub trait SpotDetector {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an RGB8 frame.
    ///
    /// Returned boxes are in pixel space of the given frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
