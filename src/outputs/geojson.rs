//! GeoJSON assembly.
//!
//! Each article gets one random marker color, shared by all of its
//! features, so pins from the same story can be told apart on a map. One
//! `Point` feature is emitted per (article, resolved place) and the
//! per-article collections are merged in article order.

use crate::error::Result;
use crate::models::{Feature, FeatureCollection, FeatureProperties, GeocodedArticle, Geometry};
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// `#rrggbb`, uniform over the whole RGB space.
pub fn random_marker_color<R: Rng>(rng: &mut R) -> String {
    format!("#{:06x}", rng.random_range(0..=0xFF_FF_FFu32))
}

/// Features for one article, all in `color`.
pub fn article_features(
    id: &str,
    article: &GeocodedArticle,
    color: &str,
    place_details: bool,
) -> FeatureCollection {
    let features = article
        .places
        .iter()
        .map(|resolved| Feature {
            geometry: Geometry::point(resolved.place.latitude, resolved.place.longitude),
            properties: FeatureProperties {
                article_id: id.to_string(),
                title: article.entry.title.clone(),
                link: article.entry.link.clone(),
                published: article.entry.published.clone(),
                summary: article.entry.summary.clone(),
                marker_color: color.to_string(),
                location: resolved.name.clone(),
                place_type: place_details.then(|| resolved.place.place_type.clone()).flatten(),
                class_type: place_details.then(|| resolved.place.class_type.clone()).flatten(),
            },
        })
        .collect();
    FeatureCollection { features }
}

/// Merge every article's features into one collection, drawing colors from
/// `rng`.
///
/// # Arguments
///
/// * `keyed` - `(id, article)` pairs from [`super::key_articles`]; ids are
///   unique, so each article draws exactly one color
/// * `place_details` - Add `place_type` / `class_type` to the properties
/// * `rng` - Source of marker colors
///
/// # Returns
///
/// The merged collection in article order, or `None` when there is nothing
/// to draw (no articles, or no resolved places).
pub fn assemble_with<R: Rng>(
    keyed: &[(String, GeocodedArticle)],
    place_details: bool,
    rng: &mut R,
) -> Option<FeatureCollection> {
    let mut merged = FeatureCollection::default();
    for (id, article) in keyed {
        let color = random_marker_color(rng);
        debug!(%id, %color, places = article.places.len(), "Assigned marker color");
        merged.merge(article_features(id, article, &color, place_details));
    }

    if merged.is_empty() {
        None
    } else {
        Some(merged)
    }
}

/// [`assemble_with`] using the thread-local RNG.
pub fn assemble(
    keyed: &[(String, GeocodedArticle)],
    place_details: bool,
) -> Option<FeatureCollection> {
    assemble_with(keyed, place_details, &mut rand::rng())
}

/// `geojson/{stories stem}_geocoded.json` next to the working directory.
pub fn default_output_path(stories_path: &Path) -> PathBuf {
    let stem = stories_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "news_entries".to_string());
    PathBuf::from("geojson").join(format!("{stem}_geocoded.json"))
}

/// Write the collection as pretty JSON, creating the parent directory.
#[instrument(level = "info", skip(collection), fields(features = collection.features.len()))]
pub async fn write_feature_collection(collection: &FeatureCollection, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(collection)?;
    fs::write(path, json).await?;
    info!(path = %path.display(), "Wrote GeoJSON");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedEntry, GeoPlace, ResolvedPlace};
    use crate::outputs::{key_articles, story_map};
    use chrono::DateTime;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn resolved(name: &str, lat: f64, lon: f64) -> ResolvedPlace {
        ResolvedPlace {
            name: name.to_string(),
            place: GeoPlace {
                latitude: lat,
                longitude: lon,
                place_type: Some("city".to_string()),
                class_type: Some("place".to_string()),
            },
        }
    }

    fn article(link: &str, places: Vec<ResolvedPlace>) -> GeocodedArticle {
        GeocodedArticle {
            entry: FeedEntry {
                title: format!("Story at {link}"),
                link: link.to_string(),
                published: "Tue, 05 Mar 2024 10:12:34 GMT".to_string(),
                published_at: DateTime::parse_from_rfc2822("Tue, 05 Mar 2024 10:12:34 GMT").ok(),
                summary: "Summary".to_string(),
                story_id: None,
            },
            places,
        }
    }

    #[test]
    fn test_marker_color_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let color = random_marker_color(&mut rng);
            assert_eq!(color.len(), 7);
            assert!(color.starts_with('#'));
            assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_one_color_per_article() {
        let articles = vec![
            article(
                "https://www.bbc.co.uk/news/world-1001",
                vec![resolved("Paris", 48.85, 2.35), resolved("France", 46.6, 1.9)],
            ),
            article(
                "https://www.bbc.co.uk/news/world-1002",
                vec![resolved("Kyiv", 50.45, 30.52), resolved("Lviv", 49.84, 24.03)],
            ),
        ];
        let mut rng = StdRng::seed_from_u64(42);
        let fc = assemble_with(&key_articles(articles), false, &mut rng).unwrap();

        assert_eq!(fc.features.len(), 4);
        let colors_of = |id: &str| {
            fc.features
                .iter()
                .filter(|f| f.properties.article_id == id)
                .map(|f| f.properties.marker_color.clone())
                .collect::<HashSet<_>>()
        };
        assert_eq!(colors_of("1001").len(), 1);
        assert_eq!(colors_of("1002").len(), 1);
        assert_ne!(colors_of("1001"), colors_of("1002"));
    }

    #[test]
    fn test_feature_properties() {
        let articles = vec![article(
            "https://www.bbc.co.uk/news/world-68458902?at_medium=RSS",
            vec![resolved("Valencia", 39.47, -0.37)],
        )];
        let fc = assemble(&key_articles(articles), false).unwrap();
        let feature = &fc.features[0];

        assert_eq!(feature.geometry, Geometry::point(39.47, -0.37));
        assert_eq!(feature.properties.article_id, "68458902");
        assert_eq!(feature.properties.location, "Valencia");
        assert_eq!(feature.properties.summary, "Summary");
        assert_eq!(feature.properties.published, "Tue, 05 Mar 2024 10:12:34 GMT");
        assert_eq!(feature.properties.place_type, None);
    }

    #[test]
    fn test_place_details_flag() {
        let articles = vec![article(
            "https://www.bbc.co.uk/news/world-1",
            vec![resolved("Valencia", 39.47, -0.37)],
        )];
        let fc = assemble(&key_articles(articles), true).unwrap();
        assert_eq!(fc.features[0].properties.place_type.as_deref(), Some("city"));
        assert_eq!(fc.features[0].properties.class_type.as_deref(), Some("place"));
    }

    #[test]
    fn test_features_follow_article_order() {
        let articles = vec![
            article("https://example.com/a-2", vec![resolved("Rome", 41.9, 12.5)]),
            article("https://example.com/a-1", vec![resolved("Oslo", 59.9, 10.7)]),
        ];
        let fc = assemble(&key_articles(articles), false).unwrap();
        let locations = fc.features.iter().map(|f| f.properties.location.as_str()).collect::<Vec<_>>();
        assert_eq!(locations, vec!["Rome", "Oslo"]);
    }

    #[test]
    fn test_nothing_to_draw_is_none() {
        assert!(assemble(&[], false).is_none());

        let no_places = vec![article("https://example.com/news/1", vec![])];
        assert!(assemble(&key_articles(no_places), false).is_none());

        let unkeyable = vec![article("https://example.com/news/live", vec![resolved("Rome", 41.9, 12.5)])];
        assert!(assemble(&key_articles(unkeyable), false).is_none());
    }

    #[test]
    fn test_shared_id_draws_one_color_and_matches_stories() {
        let articles = key_articles(vec![
            article("https://www.bbc.co.uk/news/world-1001", vec![resolved("Paris", 48.85, 2.35)]),
            article("https://www.bbc.co.uk/news/world-1001?x=1", vec![resolved("Rome", 41.9, 12.5)]),
        ]);
        let mut rng = StdRng::seed_from_u64(3);
        let fc = assemble_with(&articles, false, &mut rng).unwrap();

        assert_eq!(fc.features.len(), 1);
        assert_eq!(fc.features[0].properties.article_id, "1001");
        assert_eq!(fc.features[0].properties.location, "Rome");

        let stories = story_map(&articles);
        assert_eq!(stories["1001"].named_geo_entities, vec!["Rome"]);
    }

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(Path::new("news_stories/2024-03-05_news_entries.json"));
        assert_eq!(path, PathBuf::from("geojson/2024-03-05_news_entries_geocoded.json"));
    }

    #[tokio::test]
    async fn test_write_feature_collection() {
        let dir = std::env::temp_dir().join(format!("geo_text_news_geojson_{}", std::process::id()));
        let path = dir.join("nested").join("out.json");
        let fc = assemble(
            &key_articles(vec![article("https://example.com/news/9", vec![resolved("Oslo", 59.9, 10.7)])]),
            false,
        )
        .unwrap();

        write_feature_collection(&fc, &path).await.unwrap();
        let raw = fs::read_to_string(&path).await.unwrap();
        let back: FeatureCollection = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, fc);

        let _ = fs::remove_dir_all(&dir).await;
    }
}
