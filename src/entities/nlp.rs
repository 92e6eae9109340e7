//! Place-name extraction delegated to a named-entity tagger.
//!
//! The tagger is an OpenAI-compatible LLM reached through `awful_aj`. The
//! prompt template (loaded by name from the `awful_aj` config dir) must make
//! the model answer with:
//!
//! ```json
//! {"entities": [{"text": "Kyiv", "label": "GPE"}, {"text": "Black Sea", "label": "LOC"}]}
//! ```
//!
//! Only `GPE` (geopolitical entity) and `LOC` (other location) spans are kept.
//!
//! # Architecture
//!
//! - [`EntityTagger`]: the seam; anything that tags text
//! - [`LlmTagger`]: `awful_aj` implementation
//! - [`RetryTagger`]: decorator adding exponential backoff with jitter
//! - [`NlpExtractor`]: turns tagged spans into place names

use super::PlaceNameExtractor;
use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, config_dir, template, template::ChatTemplate};
use itertools::Itertools;
use rand::{Rng, rng};
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Entity labels that denote places.
pub const PLACE_LABELS: [&str; 2] = ["GPE", "LOC"];

/// A labeled span returned by the tagger.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaggedSpan {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Deserialize)]
struct TaggerResponse {
    #[serde(default)]
    entities: Vec<TaggedSpan>,
}

/// Anything that can tag named entities in a block of text.
pub trait EntityTagger {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, Box<dyn Error>>;
}

/// Parse the model's answer. Models like to wrap JSON in a Markdown fence,
/// so one is stripped if present.
pub fn parse_tagger_response(raw: &str) -> Result<Vec<TaggedSpan>, serde_json::Error> {
    let body = raw.trim();
    let body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .map(|b| b.trim_end().trim_end_matches("```"))
        .unwrap_or(body);
    let parsed: TaggerResponse = serde_json::from_str(body.trim())?;
    Ok(parsed.entities)
}

/// Tagger backed by an LLM through `awful_aj`.
pub struct LlmTagger {
    config: AwfulJadeConfig,
    template: ChatTemplate,
    template_name: String,
}

impl LlmTagger {
    /// Load the `awful_aj` config (`config.yaml` in its config dir) and the
    /// named prompt template.
    #[instrument(level = "info")]
    pub async fn load(template_name: &str) -> Result<Self, Box<dyn Error>> {
        let template = template::load_template(template_name).await?;
        info!(template = template_name, "Loaded tagger template");

        let conf_file = config_dir()?.join("config.yaml");
        let config_path = conf_file
            .to_str()
            .ok_or("awful_aj config path is not valid UTF-8")?;
        let config = config::load_config(config_path)?;
        info!(config_path, "Loaded tagger configuration");

        Ok(LlmTagger {
            config,
            template,
            template_name: template_name.to_string(),
        })
    }
}

impl fmt::Debug for LlmTagger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmTagger")
            .field("template", &self.template_name)
            .finish()
    }
}

impl EntityTagger for LlmTagger {
    #[instrument(level = "debug", skip_all, fields(chars = text.len()))]
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, Box<dyn Error>> {
        let t0 = Instant::now();
        let answer = ask(&self.config, text.to_string(), &self.template, None, None).await;
        let dt = t0.elapsed();

        let answer = match answer {
            Ok(a) => a,
            Err(e) => {
                warn!(elapsed_ms = dt.as_millis(), error = %e, "Tagger call failed");
                return Err(e);
            }
        };
        debug!(elapsed_ms = dt.as_millis(), "Tagger answered");
        Ok(parse_tagger_response(&answer)?)
    }
}

/// Retry decorator for any [`EntityTagger`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryTagger<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: EntityTagger> RetryTagger<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        RetryTagger {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        delay + Duration::from_millis(rng().random_range(0..=250))
    }
}

impl<T: fmt::Debug> fmt::Debug for RetryTagger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTagger")
            .field("inner", &self.inner)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: EntityTagger> EntityTagger for RetryTagger<T> {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, Box<dyn Error>> {
        let mut attempt = 0usize;
        loop {
            match self.inner.tag(text).await {
                Ok(spans) => return Ok(spans),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(attempt, max = self.max_retries, error = %e, "Tagger exhausted retries");
                        return Err(e);
                    }
                    let delay = self.backoff(attempt);
                    warn!(attempt, max = self.max_retries, ?delay, error = %e, "Tagger failed; backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Place-name extraction through an [`EntityTagger`].
#[derive(Debug)]
pub struct NlpExtractor<T> {
    tagger: T,
}

impl<T: EntityTagger> NlpExtractor<T> {
    pub fn new(tagger: T) -> Self {
        NlpExtractor { tagger }
    }
}

impl<T: EntityTagger> PlaceNameExtractor for NlpExtractor<T> {
    async fn extract(&self, sentences: &[String]) -> Result<Vec<String>, Box<dyn Error>> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }
        let text = sentences.join(" ");
        let spans = self.tagger.tag(&text).await?;
        debug!(spans = spans.len(), "Tagged entities");

        Ok(spans
            .into_iter()
            .filter(|s| PLACE_LABELS.contains(&s.label.as_str()))
            .map(|s| s.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .unique()
            .collect())
    }
}
