//! Place-name geocoding with an in-run cache.
//!
//! [`Nominatim`] issues one `/search` request per name. [`CachedGeocoder`]
//! sits in front of any [`GeocodeService`] and guarantees a name is looked
//! up at most once per run, successful or not, even when several tasks ask
//! for it at the same time.
//!
//! Every failure (no match, filtered class, timeout, bad status, bad body)
//! ends up as "no result" for that name. There is no retry or backoff.

use crate::error::GeocodeError;
use crate::models::{Article, GeoPlace, GeocodedArticle, ResolvedPlace};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

/// One external lookup of a place name.
pub trait GeocodeService {
    async fn lookup(&self, name: &str) -> Result<GeoPlace, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    class: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Turn a Nominatim `format=json` search body into the best match.
///
/// Only the first hit is considered, and only if its class is allowed.
///
/// # Arguments
///
/// * `name` - The place name that was searched, for error messages
/// * `body` - Raw response body, a JSON array of hits
/// * `allowed_classes` - Nominatim classes accepted as places
///
/// # Returns
///
/// The first hit as a [`GeoPlace`], [`GeocodeError::NotFound`] when there
/// are no hits or the first hit's class is not allowed, and
/// [`GeocodeError::Malformed`] when the body or its coordinates do not parse.
pub fn parse_search_response(
    name: &str,
    body: &str,
    allowed_classes: &[String],
) -> Result<GeoPlace, GeocodeError> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;
    let hit = hits
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NotFound(name.to_string()))?;

    let allowed = hit
        .class
        .as_deref()
        .is_some_and(|c| allowed_classes.iter().any(|a| a == c));
    if !allowed {
        debug!(name, class = ?hit.class, kind = ?hit.kind, "Best match has a filtered class");
        return Err(GeocodeError::NotFound(name.to_string()));
    }

    let latitude = hit
        .lat
        .parse::<f64>()
        .map_err(|e| GeocodeError::Malformed(format!("lat {:?}: {e}", hit.lat)))?;
    let longitude = hit
        .lon
        .parse::<f64>()
        .map_err(|e| GeocodeError::Malformed(format!("lon {:?}: {e}", hit.lon)))?;

    Ok(GeoPlace {
        latitude,
        longitude,
        place_type: hit.kind,
        class_type: hit.class,
    })
}

/// Client for a Nominatim-compatible search API.
#[derive(Debug, Clone)]
pub struct Nominatim {
    client: Client,
    base_url: String,
    allowed_classes: Vec<String>,
}

impl Nominatim {
    /// `user_agent` identifies this client to the service, as its usage
    /// policy requires.
    pub fn new(
        base_url: &str,
        user_agent: &str,
        timeout: Duration,
        allowed_classes: Vec<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Nominatim {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            allowed_classes,
        })
    }

    pub fn search_url(&self, name: &str) -> String {
        format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(name)
        )
    }
}

impl GeocodeService for Nominatim {
    #[instrument(level = "debug", skip(self))]
    async fn lookup(&self, name: &str) -> Result<GeoPlace, GeocodeError> {
        let response = self.client.get(self.search_url(name)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::ServiceUnavailable(format!("HTTP {status}")));
        }
        let body = response.text().await?;
        parse_search_response(name, &body, &self.allowed_classes)
    }
}

/// Memoizing front for a [`GeocodeService`].
#[derive(Debug)]
pub struct CachedGeocoder<S> {
    service: S,
    cache: Mutex<HashMap<String, Arc<OnceCell<Option<GeoPlace>>>>>,
}

impl<S: GeocodeService> CachedGeocoder<S> {
    pub fn new(service: S) -> Self {
        CachedGeocoder {
            service,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `name`, querying the service only on the first request for
    /// it. Concurrent callers of the same name wait for that one lookup.
    pub async fn resolve(&self, name: &str) -> Option<GeoPlace> {
        let cell = {
            let mut cache = self.cache.lock().await;
            Arc::clone(cache.entry(name.to_string()).or_default())
        };

        cell.get_or_init(|| async {
            info!(name, "Geocoding");
            match self.service.lookup(name).await {
                Ok(place) => Some(place),
                Err(e @ GeocodeError::NotFound(_)) => {
                    warn!(name, error = %e, "No geocode found");
                    None
                }
                Err(e) => {
                    warn!(name, error = %e, "Geocoding service failed to return");
                    None
                }
            }
        })
        .await
        .clone()
    }

    /// Number of distinct names seen so far.
    pub async fn cached_names(&self) -> usize {
        self.cache.lock().await.len()
    }
}

/// Geocode the place names of every article.
///
/// # Arguments
///
/// * `articles` - Articles with extracted place names
/// * `geocoder` - Cached geocoder shared by the whole run
/// * `width` - Lookups in flight at the same time; `0` is treated as `1`
///
/// # Returns
///
/// One [`GeocodedArticle`] per input article, in the same order. The
/// distinct names across all articles are looked up once each; names that
/// do not resolve are removed from their article.
#[instrument(level = "info", skip_all, fields(articles = articles.len(), width = width))]
pub async fn geocode_articles<S: GeocodeService>(
    articles: Vec<Article>,
    geocoder: &CachedGeocoder<S>,
    width: usize,
) -> Vec<GeocodedArticle> {
    let names = articles
        .iter()
        .flat_map(|a| a.place_names.iter().cloned())
        .unique()
        .collect::<Vec<_>>();
    let total = names.len();
    info!(total, "Distinct place names to geocode");

    let mut resolved = HashMap::with_capacity(total);
    let mut results = stream::iter(names)
        .map(|name| async move {
            let place = geocoder.resolve(&name).await;
            (name, place)
        })
        .buffer_unordered(width.max(1));

    let mut done = 0usize;
    while let Some((name, place)) = results.next().await {
        done += 1;
        info!(done, total, %name, found = place.is_some(), "Geocoding progress");
        if let Some(place) = place {
            resolved.insert(name, place);
        }
    }
    info!(total, resolved = resolved.len(), "Geocoding complete");

    articles
        .into_iter()
        .map(|article| {
            let places = article
                .place_names
                .iter()
                .filter_map(|name| match resolved.get(name) {
                    Some(place) => Some(ResolvedPlace {
                        name: name.clone(),
                        place: place.clone(),
                    }),
                    None => {
                        debug!(link = %article.entry.link, %name, "Removing unresolved place");
                        None
                    }
                })
                .collect();
            GeocodedArticle {
                entry: article.entry,
                places,
            }
        })
        .collect()
}
