//! # Geo Text News
//!
//! Maps the places mentioned in the news. Fetches a syndication feed,
//! extracts each article's body text, finds place names in it, geocodes
//! them, and writes a GeoJSON layer with one colored pin per (article, place).
//!
//! ## Usage
//!
//! ```sh
//! geo_text_news --limit 10
//! geo_text_news --date 2024-03-05 --output ./maps/today.geojson --extractor nlp
//! ```
//!
//! ## Architecture
//!
//! 1. **Feed**: fetch the RSS feed, keep entries published on the run date
//! 2. **Articles**: download each page and pull out the body paragraphs
//! 3. **Entities**: extract place names (gazetteer heuristic or NLP tagger)
//! 4. **Geocoding**: resolve each distinct name once, through a cache
//! 5. **Output**: stories JSON keyed by article id, plus merged GeoJSON
//!
//! Steps 2-3 run several articles at a time; step 4 runs several names at a
//! time. Everything is joined before output.

use chrono::Local;
use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod entities;
mod error;
mod feed;
mod geocoder;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::{Cli, ExtractorKind};
use config::PipelineConfig;
use entities::Extractor;
use entities::gazetteer::Gazetteer;
use entities::nlp::{LlmTagger, NlpExtractor, RetryTagger};
use geocoder::{CachedGeocoder, Nominatim, geocode_articles};
use outputs::{geojson, json, key_articles, story_map};
use pipeline::{articles_from_stories, process_entries};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("geo_text_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = PipelineConfig::load(args.config.as_deref()).await?;
    args.apply(&mut config);
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    info!(%date, feed = %config.feed_url, geocoder = %config.geocoder_url, "Configuration ready");

    // ---- Articles: fresh from the feed, or from an earlier stories file ----
    let (articles, stories_path) = match &args.from_stories {
        Some(path) => {
            let stories = json::read_stories(path).await?;
            (articles_from_stories(stories), path.clone())
        }
        None => {
            if let Err(e) = ensure_writable_dir(&args.stories_dir).await {
                error!(
                    path = %args.stories_dir.display(),
                    error = %e,
                    "Stories directory is not writable (fix perms or choose a different path)"
                );
                return Err(e.into());
            }

            let client = Client::builder().timeout(config.request_timeout()).build()?;
            let entries = feed::fetch_feed(&client, &config.feed_url, Some(date), args.limit).await?;
            if entries.is_empty() {
                warn!(%date, "No feed entries published on this date");
            }

            let extractor = build_extractor(&args).await?;
            info!(strategy = extractor.name(), "Place-name extractor ready");
            let articles = process_entries(
                &client,
                entries,
                &extractor,
                &config.placeholder_paragraphs,
                args.concurrency,
            )
            .await;
            (articles, args.stories_dir.join(json::stories_file_name(date)))
        }
    };
    info!(count = articles.len(), "Articles to geocode");

    // ---- Geocoding ----
    let nominatim = Nominatim::new(
        &config.geocoder_url,
        &config.user_agent,
        config.geocode_timeout(),
        config.allowed_classes.clone(),
    )?;
    let geocoder = CachedGeocoder::new(nominatim);
    let geocoded = geocode_articles(articles, &geocoder, args.geocode_concurrency).await;
    debug!(names = geocoder.cached_names().await, "Geocode cache size");
    let keyed = key_articles(geocoded);

    // ---- Stories file ----
    if args.from_stories.is_none() {
        let stories = story_map(&keyed);
        json::write_stories(&stories, &args.stories_dir, date).await?;
    }

    // ---- GeoJSON ----
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| geojson::default_output_path(&stories_path));
    match geojson::assemble(&keyed, args.place_details) {
        Some(collection) => {
            info!(features = collection.features.len(), path = %output.display(), "Writing GeoJSON");
            geojson::write_feature_collection(&collection, &output).await?;
        }
        None => warn!(path = %output.display(), "No geocoded places; GeoJSON not written"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Build the extraction strategy chosen on the command line.
#[instrument(level = "info", skip_all, fields(strategy = ?args.extractor))]
async fn build_extractor(args: &Cli) -> Result<Extractor, Box<dyn Error>> {
    let extractor = match args.extractor {
        ExtractorKind::Gazetteer => Extractor::Gazetteer(
            Gazetteer::load(args.countries_file.as_deref(), args.cities_file.as_deref()).await?,
        ),
        ExtractorKind::Nlp => {
            let tagger = LlmTagger::load(&args.template).await?;
            Extractor::Nlp(NlpExtractor::new(RetryTagger::new(
                tagger,
                3,
                Duration::from_secs(1),
            )))
        }
    };
    Ok(extractor)
}
