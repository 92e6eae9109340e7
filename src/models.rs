//! Data models for feed entries, articles, geocode results, and GeoJSON output.
//!
//! This module defines the records that flow through the pipeline:
//! - [`FeedEntry`]: one item of the syndication feed
//! - [`Article`]: a feed entry enriched with body text and place names
//! - [`GeoPlace`] / [`ResolvedPlace`] / [`GeocodedArticle`]: geocoding results
//! - [`StoryRecord`]: the persisted per-article record of a run
//! - [`FeatureCollection`], [`Feature`], [`Point`]: the GeoJSON output shapes

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single entry of the syndication feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    /// Article URL; also the source of the article identifier.
    pub link: String,
    /// The `pubDate` exactly as the feed wrote it.
    pub published: String,
    /// `published` parsed as RFC 2822, keeping the feed's offset. Always set
    /// for feed entries; may be `None` for stories reloaded from disk.
    pub published_at: Option<DateTime<FixedOffset>>,
    pub summary: String,
    /// Key the entry was stored under in a stories file. When `None` the id
    /// is derived from `link`.
    pub story_id: Option<String>,
}

/// A feed entry enriched by the extraction stages.
#[derive(Debug, Clone)]
pub struct Article {
    pub entry: FeedEntry,
    /// Body paragraphs in document order.
    pub paragraphs: Vec<String>,
    /// Sentences derived from `paragraphs`.
    pub sentences: Vec<String>,
    /// Distinct place names found in `sentences`.
    pub place_names: Vec<String>,
}

/// A geocoder match that passed the class allow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPlace {
    pub latitude: f64,
    pub longitude: f64,
    /// Nominatim `type`, e.g. `city` or `administrative`.
    pub place_type: Option<String>,
    /// Nominatim `class`, e.g. `place` or `boundary`.
    pub class_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub name: String,
    pub place: GeoPlace,
}

/// An article whose place names have been geocoded. Names that did not
/// resolve are gone.
#[derive(Debug, Clone)]
pub struct GeocodedArticle {
    pub entry: FeedEntry,
    pub places: Vec<ResolvedPlace>,
}

/// The persisted form of one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    #[serde(default)]
    pub named_geo_entities: Vec<String>,
}

/// Stories of one run keyed by article identifier.
pub type StoryMap = BTreeMap<String, StoryRecord>;

impl From<&GeocodedArticle> for StoryRecord {
    fn from(article: &GeocodedArticle) -> Self {
        StoryRecord {
            title: article.entry.title.clone(),
            link: article.entry.link.clone(),
            published: article.entry.published.clone(),
            summary: article.entry.summary.clone(),
            named_geo_entities: article.places.iter().map(|p| p.name.clone()).collect(),
        }
    }
}

/// A GeoJSON `Point`. Coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
}

impl Geometry {
    pub fn point(latitude: f64, longitude: f64) -> Self {
        Geometry::Point {
            coordinates: [longitude, latitude],
        }
    }
}

/// Per-feature properties. Field names follow the simplestyle convention
/// (`marker-color`) so map viewers color the pins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub article_id: String,
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    #[serde(rename = "marker-color")]
    pub marker_color: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Append every feature of `other`, keeping order.
    pub fn merge(&mut self, other: FeatureCollection) {
        self.features.extend(other.features);
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> FeedEntry {
        FeedEntry {
            title: "Floods in Valencia".to_string(),
            link: "https://www.bbc.co.uk/news/world-europe-68458902".to_string(),
            published: "Tue, 05 Mar 2024 10:12:34 GMT".to_string(),
            published_at: DateTime::parse_from_rfc2822("Tue, 05 Mar 2024 10:12:34 GMT").ok(),
            summary: "Heavy rain hits eastern Spain".to_string(),
            story_id: None,
        }
    }

    #[test]
    fn test_point_coordinates_are_lon_lat() {
        let json = serde_json::to_value(Geometry::point(39.47, -0.37)).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], -0.37);
        assert_eq!(json["coordinates"][1], 39.47);
    }

    #[test]
    fn test_feature_collection_serialization() {
        let fc = FeatureCollection {
            features: vec![Feature {
                geometry: Geometry::point(39.47, -0.37),
                properties: FeatureProperties {
                    article_id: "68458902".to_string(),
                    title: "Floods in Valencia".to_string(),
                    link: "https://www.bbc.co.uk/news/world-europe-68458902".to_string(),
                    published: "Tue, 05 Mar 2024 10:12:34 GMT".to_string(),
                    summary: "Heavy rain".to_string(),
                    marker_color: "#a1b2c3".to_string(),
                    location: "Valencia".to_string(),
                    place_type: None,
                    class_type: None,
                },
            }],
        };

        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["properties"]["marker-color"], "#a1b2c3");
        assert_eq!(json["features"][0]["properties"]["location"], "Valencia");
        assert!(json["features"][0]["properties"].get("place_type").is_none());
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut a = FeatureCollection::default();
        assert!(a.is_empty());
        let b = FeatureCollection {
            features: vec![Feature {
                geometry: Geometry::point(1.0, 2.0),
                properties: FeatureProperties {
                    article_id: "1".to_string(),
                    title: String::new(),
                    link: String::new(),
                    published: String::new(),
                    summary: String::new(),
                    marker_color: "#000000".to_string(),
                    location: "Here".to_string(),
                    place_type: None,
                    class_type: None,
                },
            }],
        };
        a.merge(b.clone());
        a.merge(b);
        assert_eq!(a.features.len(), 2);
    }

    #[test]
    fn test_story_record_from_geocoded_article() {
        let article = GeocodedArticle {
            entry: entry(),
            places: vec![ResolvedPlace {
                name: "Valencia".to_string(),
                place: GeoPlace {
                    latitude: 39.47,
                    longitude: -0.37,
                    place_type: Some("city".to_string()),
                    class_type: Some("place".to_string()),
                },
            }],
        };
        let record = StoryRecord::from(&article);
        assert_eq!(record.title, "Floods in Valencia");
        assert_eq!(record.named_geo_entities, vec!["Valencia".to_string()]);
    }

    #[test]
    fn test_story_record_deserialization_without_entities() {
        let json = r#"{
            "title": "T",
            "link": "https://example.com/1",
            "published": "Tue, 05 Mar 2024 10:12:34 GMT",
            "summary": "S"
        }"#;
        let record: StoryRecord = serde_json::from_str(json).unwrap();
        assert!(record.named_geo_entities.is_empty());
    }
}
