//! Output generation: the per-run stories file and the GeoJSON map layer.
//!
//! # Submodules
//!
//! - [`json`]: reads and writes the stories file keyed by article id
//! - [`geojson`]: assembles and writes the merged `FeatureCollection`
//!
//! # Output Structure
//!
//! ```text
//! news_stories/
//! └── 2024-03-05_news_entries.json
//!
//! geojson/
//! └── 2024-03-05_news_entries_geocoded.json
//! ```
//!
//! Both files are keyed by [`article_id`], through one [`key_articles`]
//! pass so they always agree: articles whose link has no trailing digits
//! are left out of both, and a repeated id keeps only its last article.

pub mod geojson;
pub mod json;

use crate::models::{FeedEntry, GeocodedArticle, StoryMap, StoryRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;
use url::Url;

static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)/?$").expect("static regex"));

/// The trailing digit run of the link's path, e.g. `"68458902"` for
/// `https://www.bbc.co.uk/news/world-68458902?at_medium=RSS`.
///
/// Query string and fragment are ignored. Links that are not absolute URLs
/// are matched as-is.
pub fn article_id(link: &str) -> Option<String> {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link.split(['?', '#']).next().unwrap_or(link).to_string(),
    };
    TRAILING_DIGITS
        .captures(&path)
        .map(|caps| caps[1].to_string())
}

/// The id an entry is written under: its stored key when it came from a
/// stories file, otherwise [`article_id`] of its link.
pub fn entry_id(entry: &FeedEntry) -> Option<String> {
    entry.story_id.clone().or_else(|| article_id(&entry.link))
}

/// Pair each article with its id, ready for both writers.
///
/// # Arguments
///
/// * `articles` - Geocoded articles in feed order
///
/// # Returns
///
/// `(id, article)` pairs in order of each id's first appearance. Articles
/// without an id are dropped with a warning. When two articles share an id
/// the later one replaces the earlier, in the earlier one's position.
pub fn key_articles(articles: Vec<GeocodedArticle>) -> Vec<(String, GeocodedArticle)> {
    let mut keyed: Vec<(String, GeocodedArticle)> = Vec::with_capacity(articles.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for article in articles {
        let Some(id) = entry_id(&article.entry) else {
            warn!(link = %article.entry.link, "No numeric id in link; dropping article");
            continue;
        };
        match positions.get(&id) {
            Some(&at) => {
                warn!(
                    %id,
                    replaced = %keyed[at].1.entry.link,
                    link = %article.entry.link,
                    "Duplicate article id; keeping the later article"
                );
                keyed[at].1 = article;
            }
            None => {
                positions.insert(id.clone(), keyed.len());
                keyed.push((id, article));
            }
        }
    }
    keyed
}

/// The stories file contents for keyed articles.
pub fn story_map(keyed: &[(String, GeocodedArticle)]) -> StoryMap {
    keyed
        .iter()
        .map(|(id, article)| (id.clone(), StoryRecord::from(article)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPlace, ResolvedPlace};
    use chrono::DateTime;

    fn geocoded(link: &str, places: &[&str]) -> GeocodedArticle {
        GeocodedArticle {
            entry: FeedEntry {
                title: "t".to_string(),
                link: link.to_string(),
                published: "Tue, 05 Mar 2024 10:12:34 GMT".to_string(),
                published_at: DateTime::parse_from_rfc2822("Tue, 05 Mar 2024 10:12:34 GMT").ok(),
                summary: "s".to_string(),
                story_id: None,
            },
            places: places
                .iter()
                .map(|name| ResolvedPlace {
                    name: name.to_string(),
                    place: GeoPlace {
                        latitude: 0.0,
                        longitude: 0.0,
                        place_type: None,
                        class_type: None,
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_article_id_trailing_digits() {
        assert_eq!(
            article_id("https://www.bbc.co.uk/news/world-68458902"),
            Some("68458902".to_string())
        );
    }

    #[test]
    fn test_article_id_ignores_query_and_fragment() {
        assert_eq!(
            article_id("https://www.bbc.co.uk/news/world-europe-68458902?at_medium=RSS&at_campaign=KARANGA"),
            Some("68458902".to_string())
        );
        assert_eq!(
            article_id("https://www.bbc.co.uk/news/world-68458902#comments"),
            Some("68458902".to_string())
        );
    }

    #[test]
    fn test_article_id_trailing_slash() {
        assert_eq!(article_id("https://example.com/story/123/"), Some("123".to_string()));
    }

    #[test]
    fn test_article_id_missing() {
        assert_eq!(article_id("https://www.bbc.co.uk/news/live/world"), None);
        assert_eq!(article_id("https://www.bbc.co.uk/sport/articles/c0wn7v8x9k2o"), None);
        assert_eq!(article_id("https://example.com/?id=42"), None);
    }

    #[test]
    fn test_article_id_relative_link() {
        assert_eq!(article_id("/news/world-68458902?x=1"), Some("68458902".to_string()));
    }

    #[test]
    fn test_key_articles_drops_unkeyable() {
        let keyed = key_articles(vec![
            geocoded("https://www.bbc.co.uk/news/world-68458902", &[]),
            geocoded("https://www.bbc.co.uk/news/live/world", &[]),
            geocoded("https://www.bbc.co.uk/news/world-68450001", &[]),
        ]);
        let ids = keyed.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["68458902", "68450001"]);
    }

    #[test]
    fn test_key_articles_later_duplicate_wins() {
        let keyed = key_articles(vec![
            geocoded("https://www.bbc.co.uk/news/world-1001", &["Paris"]),
            geocoded("https://www.bbc.co.uk/news/world-1002", &["Oslo"]),
            geocoded("https://www.bbc.co.uk/news/world-1001?x=1", &["Rome"]),
        ]);

        assert_eq!(keyed.len(), 2);
        assert_eq!(keyed[0].0, "1001");
        assert_eq!(keyed[0].1.places[0].name, "Rome");
        assert_eq!(keyed[1].0, "1002");

        let stories = story_map(&keyed);
        assert_eq!(stories.len(), 2);
        assert_eq!(stories["1001"].named_geo_entities, vec!["Rome"]);
    }

    #[test]
    fn test_stored_id_wins_over_link() {
        let mut article = geocoded("https://example.com/news/live", &["Rome"]);
        article.entry.story_id = Some("77".to_string());
        assert_eq!(entry_id(&article.entry), Some("77".to_string()));

        let stories = story_map(&key_articles(vec![article]));
        assert!(stories.contains_key("77"));
    }
}
