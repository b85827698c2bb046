//! Media retrieval.
//!
//! The drone stores captures in its onboard media store and exposes them
//! over a small HTTP API: one GET for the discovery document listing all
//! stored media with their resource URLs, and one GET per resource for the
//! bytes. The most recent capture is the last entry in the listing.
//!
//! Any non-200 response is a hard failure. The downloaded file is written
//! and closed before this module returns.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use url::Url;

use crate::mission::MediaSource;

const DISCOVERY_PATH: &str = "/api/v1/media/medias";

/// Client for the drone's onboard media endpoint.
#[derive(Clone, Debug)]
pub struct MediaClient {
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MediaEntry {
    #[serde(default)]
    resources: Vec<MediaResource>,
}

#[derive(Debug, Deserialize)]
struct MediaResource {
    url: String,
}

impl MediaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Derive the media endpoint from a drone connection target: the
    /// onboard web server lives on the same host as the command channel.
    pub fn for_target(connection_target: &str) -> Result<Self> {
        let url = Url::parse(connection_target)
            .map_err(|e| anyhow!("invalid connection target '{}': {}", connection_target, e))?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("connection target '{}' has no host", connection_target))?;
        Ok(Self::new(format!("http://{}", host)))
    }

    fn fetch_listing(&self) -> Result<Vec<MediaEntry>> {
        let discover_url = format!("{}{}", self.base_url, DISCOVERY_PATH);
        let response = ureq::get(&discover_url)
            .call()
            .with_context(|| format!("discover media at {}", discover_url))?;
        let body = response
            .into_string()
            .context("read media discovery document")?;
        parse_listing(&body)
    }

    fn fetch_resource(&self, resource_url: &str) -> Result<Vec<u8>> {
        let fetch_url = format!("{}{}", self.base_url, resource_url);
        log::info!("downloading capture from {}", fetch_url);
        let response = ureq::get(&fetch_url)
            .call()
            .with_context(|| format!("fetch capture from {}", fetch_url))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .context("read capture body")?;
        if bytes.is_empty() {
            bail!("capture download was empty");
        }
        Ok(bytes)
    }
}

impl MediaSource for MediaClient {
    /// Download the most recently stored capture into
    /// `dest_dir/file_name` and return the written path.
    fn download_latest(&self, dest_dir: &Path, file_name: &str) -> Result<PathBuf> {
        let listing = self.fetch_listing()?;
        let latest = listing
            .last()
            .ok_or_else(|| anyhow!("drone media store is empty"))?;
        let resource = latest
            .resources
            .first()
            .ok_or_else(|| anyhow!("most recent media entry has no resources"))?;
        let bytes = self.fetch_resource(&resource.url)?;

        let dest = dest_dir.join(file_name);
        std::fs::write(&dest, &bytes)
            .with_context(|| format!("write capture to {}", dest.display()))?;
        Ok(dest)
    }
}

fn parse_listing(body: &str) -> Result<Vec<MediaEntry>> {
    serde_json::from_str(body).context("parse media discovery document")
}
