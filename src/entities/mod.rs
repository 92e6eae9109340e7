//! Place-name extraction from article sentences.
//!
//! Two interchangeable strategies sit behind [`PlaceNameExtractor`]:
//!
//! | Strategy | Module | How |
//! |----------|--------|-----|
//! | Gazetteer | [`gazetteer`] | Capitalized runs matched against country/city lists |
//! | NLP | [`nlp`] | Named-entity tagger, keeping `GPE` and `LOC` spans |
//!
//! Both return distinct, case-sensitive names. Order is first-seen and only
//! kept so output files are stable between identical runs.

pub mod gazetteer;
pub mod nlp;

use std::error::Error;

use gazetteer::Gazetteer;
use nlp::{LlmTagger, NlpExtractor, RetryTagger};

/// Capability shared by the extraction strategies.
pub trait PlaceNameExtractor {
    /// Return the distinct place names mentioned in `sentences`.
    async fn extract(&self, sentences: &[String]) -> Result<Vec<String>, Box<dyn Error>>;
}

/// The strategy selected on the command line.
#[derive(Debug)]
pub enum Extractor {
    Gazetteer(Gazetteer),
    Nlp(NlpExtractor<RetryTagger<LlmTagger>>),
}

impl Extractor {
    pub fn name(&self) -> &'static str {
        match self {
            Extractor::Gazetteer(_) => "gazetteer",
            Extractor::Nlp(_) => "nlp",
        }
    }
}

impl PlaceNameExtractor for Extractor {
    async fn extract(&self, sentences: &[String]) -> Result<Vec<String>, Box<dyn Error>> {
        match self {
            Extractor::Gazetteer(g) => g.extract(sentences).await,
            Extractor::Nlp(n) => n.extract(sentences).await,
        }
    }
}

/// Split a paragraph into sentences after `.`, `!` or `?` followed by
/// whitespace. Abbreviations ("Mr. Smith") split too; the extractors only
/// need rough boundaries.
pub fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = paragraph.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|next| next.is_whitespace());
        if at_boundary {
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
    }
    push_trimmed(&mut sentences, &current);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}
