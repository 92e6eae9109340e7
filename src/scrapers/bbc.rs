//! BBC News article scraper.
//!
//! Article pages keep the story inside `#main-content`, one
//! `div[data-component="text-block"]` per paragraph. Embedded media leave
//! fixed notices ("This video can not be played") behind as text blocks;
//! those are dropped via the configured placeholder list.

use crate::error::{PipelineError, Result};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

static MAIN_CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#main-content").expect("static selector"));
static TEXT_BLOCK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[data-component="text-block"]"#).expect("static selector")
});

/// Extract the body paragraphs of a BBC article page, in document order.
///
/// Fails with [`PipelineError::MalformedPage`] when the content container is
/// missing, which usually means the page is not an article (live pages,
/// video pages) or the markup changed.
pub fn extract_paragraphs(url: &str, html: &str, placeholders: &[String]) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let main = document
        .select(&MAIN_CONTENT)
        .next()
        .ok_or_else(|| PipelineError::MalformedPage {
            url: url.to_string(),
            reason: "missing #main-content container".to_string(),
        })?;

    let paragraphs = main
        .select(&TEXT_BLOCK)
        .map(block_text)
        .filter(|text| !text.is_empty())
        .filter(|text| !placeholders.iter().any(|p| p == text))
        .collect();
    Ok(paragraphs)
}

// Text nodes trimmed and joined by single spaces, so inline links and
// emphasis do not glue words together.
fn block_text(block: ElementRef<'_>) -> String {
    block
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fetch a single article and extract its paragraphs.
#[instrument(level = "info", skip(client, placeholders))]
pub async fn fetch_article(client: &Client, url: &str, placeholders: &[String]) -> Result<Vec<String>> {
    let html = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    debug!(bytes = html.len(), "Downloaded article page");

    let paragraphs = extract_paragraphs(url, &html, placeholders)?;
    info!(paragraphs = paragraphs.len(), "Parsed BBC article");
    Ok(paragraphs)
}
