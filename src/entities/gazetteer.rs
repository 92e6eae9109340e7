//! Gazetteer-matching place-name heuristic.
//!
//! Each sentence is cut at punctuation, then scanned for capitalized words:
//! multi-word runs ("New York", "Burkina Faso") are taken first and removed,
//! then single capitalized words are taken from what is left. Candidates are
//! looked up in the country list, then the city list. A name in both lists
//! ("Georgia", "Singapore") is always a country.
//!
//! The scan is greedy: "In New York" at the start of a sentence is one
//! unmatched run, so "New York" is missed. Lowercase connectors ("Bosnia and
//! Herzegovina") never form a run either.

use super::PlaceNameExtractor;
use crate::error::Result;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument};

const BUILTIN_COUNTRIES: &str = include_str!("../../data/countries.txt");
const BUILTIN_CITIES: &str = include_str!("../../data/cities.txt");

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s'’\-]+").expect("static regex"));
static MULTI_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\p{Lu}[\p{L}'’\-]*(?:\s+\p{Lu}[\p{L}'’\-]*)+").expect("static regex")
});
static SINGLE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\p{Lu}[\p{L}'’\-]*").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceKind {
    Country,
    City,
}

#[derive(Debug, Clone)]
pub struct Gazetteer {
    countries: HashSet<String>,
    cities: HashSet<String>,
}

impl Gazetteer {
    /// The country and city lists bundled with the binary.
    pub fn builtin() -> Self {
        Self::from_lists(BUILTIN_COUNTRIES, BUILTIN_CITIES)
    }

    /// Build from newline-delimited lists. Blank lines and `#` comments are
    /// ignored.
    pub fn from_lists(countries: &str, cities: &str) -> Self {
        Gazetteer {
            countries: parse_list(countries),
            cities: parse_list(cities),
        }
    }

    /// Load replacement lists from files; a missing path keeps the builtin
    /// list for that set.
    #[instrument(level = "info")]
    pub async fn load(countries: Option<&Path>, cities: Option<&Path>) -> Result<Self> {
        if countries.is_none() && cities.is_none() {
            return Ok(Self::builtin());
        }
        let countries = match countries {
            Some(path) => tokio::fs::read_to_string(path).await?,
            None => BUILTIN_COUNTRIES.to_string(),
        };
        let cities = match cities {
            Some(path) => tokio::fs::read_to_string(path).await?,
            None => BUILTIN_CITIES.to_string(),
        };
        let gazetteer = Self::from_lists(&countries, &cities);
        info!(
            countries = gazetteer.countries.len(),
            cities = gazetteer.cities.len(),
            "Loaded gazetteer"
        );
        Ok(gazetteer)
    }

    /// Country wins over city.
    pub fn classify(&self, name: &str) -> Option<PlaceKind> {
        if self.countries.contains(name) {
            Some(PlaceKind::Country)
        } else if self.cities.contains(name) {
            Some(PlaceKind::City)
        } else {
            None
        }
    }

    /// Known places in one sentence, with their classification.
    pub fn places_in(&self, sentence: &str) -> Vec<(String, PlaceKind)> {
        candidates(sentence)
            .into_iter()
            .filter_map(|c| self.classify(&c).map(|kind| (c, kind)))
            .collect()
    }
}

impl PlaceNameExtractor for Gazetteer {
    async fn extract(&self, sentences: &[String]) -> std::result::Result<Vec<String>, Box<dyn Error>> {
        let places = sentences
            .iter()
            .flat_map(|s| self.places_in(s))
            .unique_by(|(name, _)| name.clone())
            .collect::<Vec<_>>();

        debug!(places = ?places, "Gazetteer matches");
        Ok(places.into_iter().map(|(name, _)| name).collect())
    }
}

fn parse_list(list: &str) -> HashSet<String> {
    list.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Capitalized candidates of a sentence: multi-word runs first, then single
/// words from the remainder, per punctuation-delimited fragment.
pub fn candidates(sentence: &str) -> Vec<String> {
    let mut out = Vec::new();
    for fragment in PUNCTUATION.split(sentence) {
        out.extend(MULTI_WORD.find_iter(fragment).map(|m| clean(m.as_str())));
        let remainder = MULTI_WORD.replace_all(fragment, " ");
        out.extend(SINGLE_WORD.find_iter(&remainder).map(|m| clean(m.as_str())));
    }
    out
}

// Collapse inner whitespace and drop a trailing possessive ("France's").
fn clean(candidate: &str) -> String {
    let joined = candidate.split_whitespace().join(" ");
    joined
        .strip_suffix("'s")
        .or_else(|| joined.strip_suffix("’s"))
        .unwrap_or(&joined)
        .trim_end_matches(['-', '\'', '’'])
        .to_string()
}
