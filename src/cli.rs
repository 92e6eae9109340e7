//! Command-line interface definitions for Geo Text News.
//!
//! Flags override the YAML pipeline config, which overrides the built-in
//! defaults. Most flags can also be set through environment variables.

use crate::config::PipelineConfig;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which place-name extraction strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtractorKind {
    /// Capitalized words matched against country and city lists.
    Gazetteer,
    /// LLM named-entity tagger through awful_aj.
    Nlp,
}

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Today's BBC world stories, at most 10
/// geo_text_news --limit 10
///
/// # A given day, written to a chosen file
/// geo_text_news -d 2024-03-05 -o ./maps/march5.geojson
///
/// # Re-geocode an existing stories file without fetching anything
/// geo_text_news --from-stories news_stories/2024-03-05_news_entries.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Maximum number of feed entries to process
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// GeoJSON output path [default: geojson/<date>_news_entries_geocoded.json]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only keep entries published on this date (YYYY-MM-DD) [default: today]
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Directory for the per-run stories JSON file
    #[arg(long, env = "GEO_NEWS_STORIES_DIR", default_value = "news_stories")]
    pub stories_dir: PathBuf,

    /// Geocode an existing stories file instead of fetching the feed
    #[arg(long)]
    pub from_stories: Option<PathBuf>,

    /// Optional path to a YAML pipeline config
    #[arg(short, long, env = "GEO_NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// RSS feed URL
    #[arg(long, env = "GEO_NEWS_FEED_URL")]
    pub feed_url: Option<String>,

    /// Base URL of a Nominatim-compatible geocoder
    #[arg(long, env = "GEO_NEWS_GEOCODER_URL")]
    pub geocoder_url: Option<String>,

    /// User-Agent sent to the geocoder
    #[arg(long, env = "GEO_NEWS_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Place-name extraction strategy
    #[arg(long, value_enum, default_value_t = ExtractorKind::Gazetteer)]
    pub extractor: ExtractorKind,

    /// Replacement country list, one name per line
    #[arg(long)]
    pub countries_file: Option<PathBuf>,

    /// Replacement city list, one name per line
    #[arg(long)]
    pub cities_file: Option<PathBuf>,

    /// awful_aj prompt template used by the nlp extractor
    #[arg(long, env = "GEO_NEWS_TEMPLATE", default_value = "place_tagger")]
    pub template: String,

    /// Articles fetched and tagged at the same time
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Geocoding requests in flight at the same time
    #[arg(long, default_value_t = 1)]
    pub geocode_concurrency: usize,

    /// Add the geocoder's place_type and class_type to feature properties
    #[arg(long)]
    pub place_details: bool,
}

impl Cli {
    /// Apply flag overrides on top of the loaded config.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(url) = &self.feed_url {
            config.feed_url = url.clone();
        }
        if let Some(url) = &self.geocoder_url {
            config.geocoder_url = url.clone();
        }
        if let Some(agent) = &self.user_agent {
            config.user_agent = agent.clone();
        }
    }
}
