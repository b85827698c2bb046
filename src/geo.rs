//! Coordinate conversion.
//!
//! Turns pixel displacements measured on the observation photo into GPS
//! displacements in degrees. The chain is a pure linear scale:
//! pixels -> inches -> meters -> degrees. It assumes the camera's pixel
//! grid is axis-aligned with the drone's local lat/long axes, which holds
//! because the capture geometry is fixed by configuration (fixed gimbal
//! pitch, fixed observation altitude).
//!
//! No rounding, no clamping. Callers own keeping the result inside safe
//! operating bounds.

use serde::Deserialize;

// Calibration: in the observation shot, 10 feet of lot span 3600 pixels.
pub const INCHES_PER_PIXEL: f64 = (10.0 / 3600.0) * 12.0;
pub const METERS_PER_INCH: f64 = 0.0254;
// 1 degree of latitude is about 111 kilometers at the deployment latitude.
pub const DEGREES_PER_METER: f64 = 1.0 / 111_139.0;

/// An absolute GPS fix with altitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl GeoPosition {
    /// Apply a GPS delta and replace the altitude.
    pub fn offset_by(&self, delta: &GpsDelta, altitude_m: f64) -> GeoPosition {
        GeoPosition {
            latitude_deg: self.latitude_deg + delta.latitude_deg,
            longitude_deg: self.longitude_deg + delta.longitude_deg,
            altitude_m,
        }
    }

    /// Same fix at a different altitude.
    pub fn at_altitude(&self, altitude_m: f64) -> GeoPosition {
        GeoPosition {
            altitude_m,
            ..*self
        }
    }
}

/// Displacement in image pixels from the fixed reference point
/// (frame horizontal midpoint, vertical origin).
///
/// Negative horizontal means left of the reference, positive means right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelOffset {
    pub horizontal: f64,
    pub vertical: f64,
}

impl PixelOffset {
    /// Euclidean norm of the offset, in pixels.
    pub fn norm(&self) -> f64 {
        self.horizontal.hypot(self.vertical)
    }
}

/// Displacement in degrees of latitude/longitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpsDelta {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

/// The calibrated scale chain from image pixels to GPS degrees.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct GroundScale {
    pub inches_per_pixel: f64,
    pub meters_per_inch: f64,
    pub degrees_per_meter: f64,
}

impl Default for GroundScale {
    fn default() -> Self {
        Self {
            inches_per_pixel: INCHES_PER_PIXEL,
            meters_per_inch: METERS_PER_INCH,
            degrees_per_meter: DEGREES_PER_METER,
        }
    }
}

impl GroundScale {
    /// The collapsed scale chain: degrees of arc per image pixel.
    pub fn degrees_per_pixel(&self) -> f64 {
        self.inches_per_pixel * self.meters_per_inch * self.degrees_per_meter
    }

    /// Convert one pixel offset into a GPS delta.
    ///
    /// Horizontal pixels map to latitude degrees and vertical pixels to
    /// longitude degrees; the fixed capture geometry pins this axis
    /// alignment.
    pub fn pixel_offset_to_gps_delta(&self, offset: PixelOffset) -> GpsDelta {
        let degrees_per_pixel = self.degrees_per_pixel();
        GpsDelta {
            latitude_deg: offset.horizontal * degrees_per_pixel,
            longitude_deg: offset.vertical * degrees_per_pixel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_offset_maps_to_zero_delta() {
        let scale = GroundScale::default();
        let delta = scale.pixel_offset_to_gps_delta(PixelOffset {
            horizontal: 0.0,
            vertical: 0.0,
        });
        assert_eq!(delta.latitude_deg, 0.0);
        assert_eq!(delta.longitude_deg, 0.0);
    }

    #[test]
    fn conversion_is_linear() {
        let scale = GroundScale::default();
        let base = PixelOffset {
            horizontal: 123.0,
            vertical: -456.0,
        };
        for k in [0.5, 2.0, -3.0, 10.0] {
            let scaled = scale.pixel_offset_to_gps_delta(PixelOffset {
                horizontal: base.horizontal * k,
                vertical: base.vertical * k,
            });
            let unscaled = scale.pixel_offset_to_gps_delta(base);
            assert!((scaled.latitude_deg - unscaled.latitude_deg * k).abs() < 1e-15);
            assert!((scaled.longitude_deg - unscaled.longitude_deg * k).abs() < 1e-15);
        }
    }

    #[test]
    fn default_chain_matches_calibration() {
        let scale = GroundScale::default();
        // 3600 pixels span 10 feet = 3.048 meters on the lot.
        let meters = 3600.0 * scale.inches_per_pixel * scale.meters_per_inch;
        assert!((meters - 3.048).abs() < 1e-9);

        let delta = scale.pixel_offset_to_gps_delta(PixelOffset {
            horizontal: 3600.0,
            vertical: 0.0,
        });
        assert!((delta.latitude_deg - 3.048 / 111_139.0).abs() < 1e-12);
    }

    #[test]
    fn offset_by_applies_delta_and_altitude() {
        let home = GeoPosition {
            latitude_deg: 48.0,
            longitude_deg: 2.0,
            altitude_m: 1.8,
        };
        let moved = home.offset_by(
            &GpsDelta {
                latitude_deg: 0.001,
                longitude_deg: -0.002,
            },
            0.25,
        );
        assert!((moved.latitude_deg - 48.001).abs() < 1e-12);
        assert!((moved.longitude_deg - 1.998).abs() < 1e-12);
        assert_eq!(moved.altitude_m, 0.25);
    }
}
