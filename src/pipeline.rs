//! The request pipeline: resolve → extract → filter → geocode → map.
//!
//! Every stage runs once per submission, in order, with no shared mutable
//! state. The LLM and geocoder are type parameters so tests can run the
//! whole chain against stubs.

use chrono::Utc;
use reqwest::Client;
use std::time::Instant;
use tracing::{info, instrument};

use crate::api::{AskAsync, extract_locations};
use crate::config::Settings;
use crate::error::{NewsMapError, Result};
use crate::filter::retain_confident;
use crate::geocode::{Geocode, geocode_all};
use crate::models::{ArticleInput, MapReport};
use crate::outputs::map::build_map_view;
use crate::scrapers;

/// Resolved article text shorter than this is treated as no article at all.
pub const MIN_ARTICLE_CHARS: usize = 50;

#[derive(Debug)]
pub struct Pipeline<L, G> {
    pub http: Client,
    pub llm: L,
    pub geocoder: G,
    pub settings: Settings,
}

impl<L, G> Pipeline<L, G>
where
    L: AskAsync<Response = String> + Sync,
    G: Geocode + Sync,
{
    pub fn new(http: Client, llm: L, geocoder: G, settings: Settings) -> Self {
        Self {
            http,
            llm,
            geocoder,
            settings,
        }
    }

    /// Run one submission end to end.
    #[instrument(level = "info", skip_all, fields(input = input.kind()))]
    pub async fn run(&self, input: &ArticleInput) -> Result<MapReport> {
        let t0 = Instant::now();

        let article = scrapers::resolve(&self.http, input, &self.settings.fetch).await?;
        if article.chars().count() < MIN_ARTICLE_CHARS {
            return Err(NewsMapError::EmptyArticle);
        }

        let records =
            extract_locations(&self.llm, &article, self.settings.llm.max_article_chars).await?;
        let extracted = records.len();

        let confident = retain_confident(records);
        let retained = confident.len();
        info!(extracted, retained, "Applied confidence filter");

        let located = geocode_all(&self.geocoder, confident).await?;
        let map = build_map_view(located, &self.settings.map);

        info!(
            extracted,
            retained,
            placed = map.locations.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Pipeline complete"
        );
        Ok(MapReport {
            extracted,
            retained,
            map,
            generated_at: Utc::now(),
        })
    }
}
