//! RSS feed fetching and date filtering.
//!
//! The feed is deserialized with `quick-xml`'s serde support. Only the
//! fields the pipeline uses are declared; everything else in the channel
//! (images, `atom:link`, media thumbnails) is ignored.

use crate::error::Result;
use crate::models::FeedEntry;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Parse an RSS 2.0 document into feed entries, in feed order.
///
/// Items without a link or without a parseable RFC 2822 `pubDate` are
/// skipped, since neither the date filter nor the article id can work
/// without them.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let rss: Rss = quick_xml::de::from_str(xml)?;

    let mut entries = Vec::with_capacity(rss.channel.items.len());
    for item in rss.channel.items {
        let Some(link) = item.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) else {
            warn!(title = ?item.title, "Feed item has no link; skipping");
            continue;
        };
        let Some(published) = item.pub_date.map(|d| d.trim().to_string()) else {
            warn!(%link, "Feed item has no pubDate; skipping");
            continue;
        };
        let published_at = match DateTime::parse_from_rfc2822(&published) {
            Ok(ts) => ts,
            Err(e) => {
                warn!(%link, %published, error = %e, "Unparseable pubDate; skipping");
                continue;
            }
        };

        entries.push(FeedEntry {
            title: item.title.unwrap_or_default().trim().to_string(),
            link,
            published,
            published_at: Some(published_at),
            summary: item.description.unwrap_or_default().trim().to_string(),
            story_id: None,
        });
    }
    Ok(entries)
}

/// Keep the entries published on `date` (when given), then cap at `limit`.
///
/// The date is compared in the feed's own offset, so an entry stamped
/// `Tue, 05 Mar 2024 23:30:00 -0500` belongs to March 5th.
///
/// # Arguments
///
/// * `entries` - Parsed feed entries, in feed order
/// * `date` - Publication date to keep; `None` keeps every entry
/// * `limit` - Maximum number of entries to return, counted after the
///   date filter
///
/// # Returns
///
/// The matching entries, still in feed order.
pub fn filter_entries(
    entries: Vec<FeedEntry>,
    date: Option<NaiveDate>,
    limit: Option<usize>,
) -> Vec<FeedEntry> {
    let matching = entries
        .into_iter()
        .filter(|e| {
            date.is_none_or(|d| e.published_at.is_some_and(|ts| ts.date_naive() == d))
        });

    match limit {
        Some(n) => matching.take(n).collect(),
        None => matching.collect(),
    }
}

/// Fetch the feed at `url`, parse it, and filter by date and limit.
///
/// # Arguments
///
/// * `client` - Shared HTTP client
/// * `url` - RSS 2.0 feed URL
/// * `date` - Publication date to keep, see [`filter_entries`]
/// * `limit` - Maximum number of entries to keep
///
/// # Returns
///
/// The kept entries in feed order, or an error when the feed cannot be
/// downloaded or is not RSS. There is no retry: an unreachable feed or an
/// error status ends the run.
#[instrument(level = "info", skip(client))]
pub async fn fetch_feed(
    client: &Client,
    url: &str,
    date: Option<NaiveDate>,
    limit: Option<usize>,
) -> Result<Vec<FeedEntry>> {
    let xml = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    debug!(bytes = xml.len(), "Downloaded feed");

    let all = parse_feed(&xml)?;
    let total = all.len();
    let entries = filter_entries(all, date, limit);
    info!(total, kept = entries.len(), "Fetched feed entries");
    Ok(entries)
}
