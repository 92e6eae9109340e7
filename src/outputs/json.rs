//! The per-run stories file.
//!
//! One JSON object per run, named by the run date, mapping article id to the
//! article's feed fields and resolved place names:
//!
//! ```text
//! stories_dir/
//! └── 2024-03-05_news_entries.json
//! ```
//!
//! ```json
//! {
//!   "68458902": {
//!     "title": "...",
//!     "link": "https://www.bbc.co.uk/news/world-europe-68458902",
//!     "published": "Tue, 05 Mar 2024 10:12:34 GMT",
//!     "summary": "...",
//!     "named_geo_entities": ["Valencia", "Spain"]
//!   }
//! }
//! ```

use crate::error::{PipelineError, Result};
use crate::models::StoryMap;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub fn stories_file_name(date: NaiveDate) -> String {
    format!("{}_news_entries.json", date.format("%Y-%m-%d"))
}

/// Write the run's stories as pretty JSON, creating `dir` if needed.
///
/// # Arguments
///
/// * `stories` - Stories keyed by article id
/// * `dir` - Stories directory
/// * `date` - Run date, used in the file name
///
/// # Returns
///
/// The path written, `{dir}/{YYYY-MM-DD}_news_entries.json`, or an error if
/// the directory cannot be created or the file cannot be written.
#[instrument(level = "info", skip(stories), fields(count = stories.len()))]
pub async fn write_stories(stories: &StoryMap, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(stories)?;

    if let Err(e) = fs::create_dir_all(dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create stories dir");
        return Err(e.into());
    }

    let path = dir.join(stories_file_name(date));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote stories file");
    Ok(path)
}

/// Load a stories file written by [`write_stories`].
///
/// An empty file, or one holding no stories (`{}`), is
/// [`PipelineError::NoData`] rather than an empty map.
#[instrument(level = "info")]
pub async fn read_stories(path: &Path) -> Result<StoryMap> {
    let json = fs::read_to_string(path).await?;
    if json.trim().is_empty() {
        return Err(PipelineError::NoData(format!("{} is empty", path.display())));
    }
    let stories: StoryMap = serde_json::from_str(&json)?;
    if stories.is_empty() {
        return Err(PipelineError::NoData(format!("{} has no stories", path.display())));
    }
    info!(count = stories.len(), "Loaded stories file");
    Ok(stories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoryRecord;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("geo_text_news_{}_{}", name, std::process::id()))
    }

    fn record(link: &str, places: &[&str]) -> StoryRecord {
        StoryRecord {
            title: "Floods".to_string(),
            link: link.to_string(),
            published: "Tue, 05 Mar 2024 10:12:34 GMT".to_string(),
            summary: "Rain".to_string(),
            named_geo_entities: places.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_stories_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(stories_file_name(date), "2024-03-05_news_entries.json");
    }

    #[tokio::test]
    async fn test_write_then_read_stories() {
        let dir = scratch_dir("stories");
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let mut stories = StoryMap::new();
        stories.insert(
            "68458902".to_string(),
            record("https://www.bbc.co.uk/news/world-europe-68458902", &["Valencia"]),
        );

        let path = write_stories(&stories, &dir, date).await.unwrap();
        assert!(path.ends_with("2024-03-05_news_entries.json"));

        let raw = fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["68458902"]["named_geo_entities"][0], "Valencia");

        let loaded = read_stories(&path).await.unwrap();
        assert_eq!(loaded, stories);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_read_empty_file_is_no_data() {
        let dir = scratch_dir("empty");
        fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("empty.json");
        fs::write(&path, "  \n").await.unwrap();

        let err = read_stories(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoData(_)));

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_read_empty_collection_is_no_data() {
        let dir = scratch_dir("empty_map");
        fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("none.json");
        fs::write(&path, "{}\n").await.unwrap();

        let err = read_stories(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoData(_)));

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let err = read_stories(Path::new("/nonexistent/geo_text_news.json")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
