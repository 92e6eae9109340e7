//! Pipeline configuration.
//!
//! Values come from three layers, lowest precedence first: the built-in
//! defaults below, an optional YAML file (`--config`), and CLI flags or
//! environment variables (applied in `main`).
//!
//! ```yaml
//! feed_url: http://feeds.bbci.co.uk/news/world/rss.xml
//! geocoder_url: https://nominatim.openstreetmap.org
//! user_agent: geo_coder
//! geocode_timeout_secs: 5
//! allowed_classes: [place, boundary]
//! placeholder_paragraphs:
//!   - This video can not be played
//! ```

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_FEED_URL: &str = "http://feeds.bbci.co.uk/news/world/rss.xml";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "geo_coder";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub feed_url: String,
    pub geocoder_url: String,
    /// Client identifier sent with every geocoding request.
    pub user_agent: String,
    pub geocode_timeout_secs: u64,
    /// Timeout for feed and article requests.
    pub request_timeout_secs: u64,
    /// Geocoder classes accepted as a match.
    pub allowed_classes: Vec<String>,
    /// Paragraph texts that are page furniture rather than article body.
    pub placeholder_paragraphs: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            feed_url: DEFAULT_FEED_URL.to_string(),
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            geocode_timeout_secs: 5,
            request_timeout_secs: 30,
            allowed_classes: vec!["place".to_string(), "boundary".to_string()],
            placeholder_paragraphs: vec![
                "This video can not be played".to_string(),
                "To play this video you need to enable JavaScript in your browser.".to_string(),
            ],
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document; keys that are absent keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from `path`, or fall back to the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let yaml = tokio::fs::read_to_string(path).await?;
                let config = Self::from_yaml(&yaml)?;
                info!(path = %path.display(), "Loaded pipeline configuration");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
