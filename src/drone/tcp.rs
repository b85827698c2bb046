//! TCP drone link.
//!
//! Speaks the JSON-lines protocol in [`super::wire`] to a ground-SDK
//! endpoint. Exactly one command is in flight at a time: each method
//! writes one request line, then reads event lines until the paired
//! confirmation arrives or the deadline passes. Unrelated telemetry
//! received while waiting is skipped.

use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use url::Url;

use super::wire::{Command, Event, FlyingState, MoveStatus, PhotoResult, Request, Response};
use super::{
    Ack, CameraMode, DroneLink, GimbalTarget, OrientationMode, PhotoSettings, RelativeMove,
};
use crate::geo::GeoPosition;

const DEFAULT_PORT: u16 = 44444;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const POSITION_TIMEOUT: Duration = Duration::from_secs(5);
const CAM_ID: u8 = 0;
const GIMBAL_ID: u8 = 0;

/// The drone echoes the commanded target in its arrival event; a tight
/// tolerance only absorbs the JSON float round-trip.
const FIX_TOLERANCE: f64 = 1e-9;

pub struct TcpLink {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
    seq: u64,
    connected: bool,
}

impl TcpLink {
    pub fn connect(url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("connection target missing host"))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);
        let addr = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("resolve drone address {}:{}", host, port))?
            .next()
            .ok_or_else(|| anyhow!("drone address {}:{} did not resolve", host, port))?;
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .with_context(|| format!("connect to drone at {}", addr))?;
        stream.set_nodelay(true).context("configure drone stream")?;
        let reader = BufReader::new(stream.try_clone().context("clone drone stream")?);
        Ok(Self {
            writer: stream,
            reader,
            seq: 0,
            connected: true,
        })
    }

    fn send(&mut self, command: Command) -> Result<()> {
        self.seq += 1;
        let request = Request {
            seq: self.seq,
            command,
        };
        let mut line = serde_json::to_string(&request).context("encode drone command")?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .context("send drone command")?;
        self.writer.flush().context("flush drone command")?;
        Ok(())
    }

    /// Read events until `matcher` produces an outcome or the timeout
    /// elapses. A rejection event ends the wait regardless of the matcher;
    /// a closed stream is a channel error, not a timeout.
    fn wait_for<F>(&mut self, timeout: Duration, mut matcher: F) -> Result<Ack>
    where
        F: FnMut(&Event) -> Option<Ack>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(Ack::TimedOut);
            }
            self.reader
                .get_ref()
                .set_read_timeout(Some(deadline - now))
                .context("set drone read timeout")?;

            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return Err(anyhow!("drone channel closed while awaiting confirmation")),
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    return Ok(Ack::TimedOut);
                }
                Err(e) => return Err(e).context("read drone event"),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let response: Response = match serde_json::from_str(trimmed) {
                Ok(response) => response,
                Err(e) => {
                    log::warn!("skipping unparseable drone event: {}", e);
                    continue;
                }
            };
            if let Event::CommandRejected { reason } = &response.event {
                return Ok(Ack::Rejected(reason.clone()));
            }
            if let Some(ack) = matcher(&response.event) {
                return Ok(ack);
            }
        }
    }
}

fn same_fix(a: f64, b: f64) -> bool {
    (a - b).abs() <= FIX_TOLERANCE
}

fn move_status_ack(status: MoveStatus, action: &str) -> Option<Ack> {
    match status {
        MoveStatus::Done => Some(Ack::Confirmed),
        MoveStatus::Canceled => Some(Ack::Rejected(format!("{} canceled", action))),
        MoveStatus::Error => Some(Ack::Rejected(format!("{} failed", action))),
        MoveStatus::Running => None,
    }
}

impl DroneLink for TcpLink {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn take_off(&mut self, timeout: Duration) -> Result<Ack> {
        self.send(Command::TakeOff)?;
        self.wait_for(timeout, |event| match event {
            Event::FlyingStateChanged {
                state: FlyingState::Hovering,
            } => Some(Ack::Confirmed),
            Event::FlyingStateChanged {
                state: FlyingState::Emergency,
            } => Some(Ack::Rejected("vehicle entered emergency state".into())),
            _ => None,
        })
    }

    fn land(&mut self, timeout: Duration) -> Result<Ack> {
        self.send(Command::Land)?;
        self.wait_for(timeout, |event| match event {
            Event::FlyingStateChanged {
                state: FlyingState::Landed,
            } => Some(Ack::Confirmed),
            Event::FlyingStateChanged {
                state: FlyingState::Emergency,
            } => Some(Ack::Rejected("vehicle entered emergency state".into())),
            _ => None,
        })
    }

    fn move_to(
        &mut self,
        target: GeoPosition,
        orientation: OrientationMode,
        timeout: Duration,
    ) -> Result<Ack> {
        self.send(Command::MoveTo {
            latitude_deg: target.latitude_deg,
            longitude_deg: target.longitude_deg,
            altitude_m: target.altitude_m,
            orientation_mode: orientation,
            heading_deg: 0.0,
        })?;
        self.wait_for(timeout, |event| match event {
            Event::MoveToChanged {
                latitude_deg,
                longitude_deg,
                altitude_m,
                status,
            } => {
                let arrived = same_fix(*latitude_deg, target.latitude_deg)
                    && same_fix(*longitude_deg, target.longitude_deg)
                    && same_fix(*altitude_m, target.altitude_m);
                match status {
                    MoveStatus::Done if arrived => Some(Ack::Confirmed),
                    // Arrival at a stale target from a previous move.
                    MoveStatus::Done => None,
                    other => move_status_ack(*other, "move"),
                }
            }
            _ => None,
        })
    }

    fn move_by(&mut self, delta: RelativeMove, timeout: Duration) -> Result<Ack> {
        self.send(Command::MoveBy {
            dx_m: delta.dx_m,
            dy_m: delta.dy_m,
            dz_m: delta.dz_m,
            dyaw_rad: delta.dyaw_rad,
        })?;
        self.wait_for(timeout, |event| match event {
            Event::MoveByEnded { status, .. } => move_status_ack(*status, "relative move"),
            _ => None,
        })
    }

    fn set_camera_mode(&mut self, mode: CameraMode, timeout: Duration) -> Result<Ack> {
        self.send(Command::SetCameraMode { cam_id: CAM_ID, mode })?;
        self.wait_for(timeout, |event| match event {
            Event::CameraModeChanged {
                cam_id: CAM_ID,
                mode: reported,
            } if *reported == mode => Some(Ack::Confirmed),
            _ => None,
        })
    }

    fn set_photo_mode(&mut self, settings: &PhotoSettings, timeout: Duration) -> Result<Ack> {
        self.send(Command::SetPhotoMode {
            cam_id: CAM_ID,
            settings: settings.clone(),
        })?;
        self.wait_for(timeout, |event| match event {
            Event::PhotoModeChanged { cam_id: CAM_ID } => Some(Ack::Confirmed),
            _ => None,
        })
    }

    fn trigger_photo(&mut self, timeout: Duration) -> Result<Ack> {
        self.send(Command::TakePhoto { cam_id: CAM_ID })?;
        self.wait_for(timeout, |event| match event {
            Event::PhotoProgress {
                result: PhotoResult::PhotoSaved,
            } => Some(Ack::Confirmed),
            Event::PhotoProgress {
                result: PhotoResult::Error,
            } => Some(Ack::Rejected("photo capture failed".into())),
            _ => None,
        })
    }

    fn set_gimbal_target(&mut self, target: GimbalTarget, timeout: Duration) -> Result<Ack> {
        self.send(Command::SetGimbalTarget {
            gimbal_id: GIMBAL_ID,
            target,
        })?;
        self.wait_for(timeout, |event| match event {
            Event::GimbalTargetReached {
                gimbal_id: GIMBAL_ID,
            } => Some(Ack::Confirmed),
            _ => None,
        })
    }

    fn position(&mut self) -> Result<GeoPosition> {
        self.send(Command::GetPosition)?;
        let mut fix = None;
        let ack = self.wait_for(POSITION_TIMEOUT, |event| match event {
            Event::Position {
                latitude_deg,
                longitude_deg,
                altitude_m,
            } => {
                fix = Some(GeoPosition {
                    latitude_deg: *latitude_deg,
                    longitude_deg: *longitude_deg,
                    altitude_m: *altitude_m,
                });
                Some(Ack::Confirmed)
            }
            _ => None,
        })?;
        ack.require("position query")?;
        fix.ok_or_else(|| anyhow!("position event carried no fix"))
    }

    fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        match self.writer.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e).context("shutdown drone channel"),
        }
    }
}
