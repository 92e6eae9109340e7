//! Article body scrapers.
//!
//! Each scraper module knows the markup of one publisher and exports:
//! - `extract_paragraphs(html, placeholders)`: pure parsing of a fetched page
//! - `fetch_article(client, url, placeholders)`: download + parse
//!
//! | Source | Module | Container | Paragraphs |
//! |--------|--------|-----------|------------|
//! | BBC News | [`bbc`] | `#main-content` | `div[data-component="text-block"]` |
//!
//! Markup assumptions are unversioned and must track the publisher's site.

pub mod bbc;
