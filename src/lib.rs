//! parkpilot
//!
//! This crate flies a camera quadcopter through a fixed parking mission:
//! take off, climb to an observation altitude, photograph the lot below,
//! locate the nearest open spot with a pretrained detector, fly to it,
//! dwell, then return home and land.
//!
//! # Architecture
//!
//! Two components run strictly in sequence, with no concurrency:
//!
//! 1. **Mission Sequencer** (`mission`): drives the command/acknowledgment
//!    protocol step by step and owns the single mission-state record.
//! 2. **Spot Locator** (`vision`): turns one captured image into the pixel
//!    offset and distance of the closest detected spot.
//!
//! Control flows one way: the sequencer calls the locator once per mission
//! and consumes its result. Every failure unwinds to a single recovery
//! path that returns home (when a home fix was recorded) and forces a
//! landing attempt.
//!
//! # Module Structure
//!
//! - `drone`: typed request/acknowledgment channel to the aircraft
//! - `geo`: pure pixel-offset to GPS-delta conversion
//! - `media`: HTTP retrieval from the drone's onboard media store
//! - `vision`: detector backends and closest-spot selection
//! - `mission`: the sequencer and its recovery path
//! - `config`: explicit configuration shared by both components

pub mod config;
pub mod drone;
pub mod geo;
pub mod media;
pub mod mission;
pub mod vision;

pub use config::{MissionConfig, Mode};
pub use drone::{connect, Ack, DroneLink, OrientationMode, StubLink, TcpLink};
pub use geo::{GeoPosition, GpsDelta, GroundScale, PixelOffset};
pub use media::MediaClient;
pub use mission::{force_land, MediaSource, Mission, MissionReport, SurveyPipeline};
#[cfg(feature = "backend-tract")]
pub use vision::TractDetector;
pub use vision::{
    Detection, NoSpotFound, SpotDetector, SpotFix, SpotLocator, SpotSource, StubDetector,
};
