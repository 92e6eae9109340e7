//! Per-article stages between the feed and the geocoder.
//!
//! Articles are fetched and tagged with at most `width` in flight. A page
//! that fails to download or parse, or a tagger failure, costs only that
//! article.

use crate::entities::{PlaceNameExtractor, split_sentences};
use crate::models::{Article, FeedEntry, StoryMap};
use crate::scrapers::bbc;
use crate::utils::truncate_for_log;
use chrono::DateTime;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::Client;
use std::error::Error;
use tracing::{debug, error, info, instrument};

/// Split paragraphs into sentences and extract the article's place names.
pub async fn analyze_article<E: PlaceNameExtractor>(
    entry: FeedEntry,
    paragraphs: Vec<String>,
    extractor: &E,
) -> Result<Article, Box<dyn Error>> {
    let sentences = paragraphs
        .iter()
        .flat_map(|p| split_sentences(p))
        .collect::<Vec<_>>();
    let place_names = extractor.extract(&sentences).await?;
    debug!(link = %entry.link, places = ?place_names, "Extracted place names");

    Ok(Article {
        entry,
        paragraphs,
        sentences,
        place_names,
    })
}

/// Fetch, parse, and tag every entry.
///
/// # Arguments
///
/// * `client` - Shared HTTP client for the article pages
/// * `entries` - Feed entries, in feed order
/// * `extractor` - Place-name extraction strategy
/// * `placeholders` - Paragraph texts to drop (embedded media notices)
/// * `width` - Articles fetched and tagged at the same time; `0` is
///   treated as `1`
///
/// # Returns
///
/// The articles that made it through, in feed order. An article whose page
/// cannot be fetched or parsed, or whose extraction fails, is logged and
/// left out; the others are unaffected.
#[instrument(level = "info", skip_all, fields(entries = entries.len(), width = width))]
pub async fn process_entries<E: PlaceNameExtractor>(
    client: &Client,
    entries: Vec<FeedEntry>,
    extractor: &E,
    placeholders: &[String],
    width: usize,
) -> Vec<Article> {
    let total = entries.len();

    let articles: Vec<Article> = stream::iter(entries.into_iter().enumerate())
        .map(|(index, entry)| async move {
            let paragraphs = match bbc::fetch_article(client, &entry.link, placeholders).await {
                Ok(p) => p,
                Err(e) => {
                    error!(index, link = %entry.link, error = %e, "Article fetch failed; skipping");
                    return None;
                }
            };
            let title = truncate_for_log(&entry.title, 80);
            match analyze_article(entry, paragraphs, extractor).await {
                Ok(article) => {
                    info!(
                        done = index + 1,
                        total,
                        %title,
                        paragraphs = article.paragraphs.len(),
                        sentences = article.sentences.len(),
                        places = article.place_names.len(),
                        "Processed article"
                    );
                    Some(article)
                }
                Err(e) => {
                    error!(index, %title, error = %e, "Place-name extraction failed; skipping");
                    None
                }
            }
        })
        .buffered(width.max(1))
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(
        total,
        processed = articles.len(),
        failed = total - articles.len(),
        "Completed article processing"
    );
    articles
}

/// Rebuild articles from a stories file so they can be geocoded again.
///
/// Every record is kept under its stored key. A `published` value that is
/// not RFC 2822 only leaves `published_at` unset.
pub fn articles_from_stories(stories: StoryMap) -> Vec<Article> {
    stories
        .into_iter()
        .map(|(id, record)| {
            let published_at = match DateTime::parse_from_rfc2822(&record.published) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    debug!(%id, published = %record.published, error = %e, "Stored date is not RFC 2822");
                    None
                }
            };
            Article {
                entry: FeedEntry {
                    title: record.title,
                    link: record.link,
                    published: record.published,
                    published_at,
                    summary: record.summary,
                    story_id: Some(id),
                },
                paragraphs: Vec::new(),
                sentences: Vec::new(),
                place_names: record.named_geo_entities.into_iter().unique().collect(),
            }
        })
        .collect()
}
