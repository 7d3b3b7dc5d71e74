//! # Merchant Playbook
//!
//! Builds a data-backed marketing report for a single merchant.
//!
//! ## Core Concepts
//!
//! - **Sources**: three CSV tables (merchant master, monthly usage, monthly
//!   customer/context metrics) joined on `ENCODED_MCT` and `TA_YM`
//! - **Comparison**: NaN-tolerant metrics for one merchant next to the same
//!   metrics over the whole merged set
//! - **Strategies**: prompt templates selected by simple threshold rules
//! - **Narratives**: each prompt sent to a text-generation model, with a
//!   placeholder when a call fails or times out
//!
//! ## Example
//!
//! ```rust,ignore
//! use merchant_playbook::*;
//!
//! let pipeline = PlaybookPipeline::new(PlaybookConfig::from_env()?);
//! match pipeline.analyze("mct01234", &mut RandomMarkers::new())? {
//!     QueryOutcome::Ready(analysis) => {
//!         let report = pipeline.narrate(&renderer, &analysis.prompts).await;
//!     }
//!     other => println!("{}", other.message().unwrap_or_default()),
//! }
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod merge;
pub mod metrics;
pub mod narrative;
pub mod report;
pub mod schema;
pub mod strategy;
pub mod utils;

#[cfg(feature = "gemini")]
pub mod llm;

pub use config::PlaybookConfig;
pub use error::{PlaybookError, Result};
pub use loader::{load_merged, load_table, DatasetCache, SourcePaths};
pub use merge::{inner_join, merge_sources};
pub use metrics::{compare_merchant, nan_mean, summarize, ColumnOrDefault, MerchantComparison};
pub use narrative::{render_narratives, NarrativeRenderer, NarrativeReport, NarrativeSection};
pub use report::{MerchantAnalysis, QueryOutcome, SummaryRow, SummaryValue};
pub use schema::*;
pub use strategy::{select_strategies, MarkerChooser, RandomMarkers};

use log::info;
use std::sync::Arc;

/// Runs merchant queries against the memoized merged dataset.
pub struct PlaybookPipeline<'c> {
    config: PlaybookConfig,
    cache: &'c DatasetCache,
}

impl PlaybookPipeline<'static> {
    /// Uses the process-wide [`DatasetCache::global`].
    pub fn new(config: PlaybookConfig) -> Self {
        Self::with_cache(config, DatasetCache::global())
    }
}

impl<'c> PlaybookPipeline<'c> {
    pub fn with_cache(config: PlaybookConfig, cache: &'c DatasetCache) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &PlaybookConfig {
        &self.config
    }

    pub fn dataset(&self) -> Result<Arc<Table>> {
        self.cache.get_or_load(&self.config.sources)
    }

    /// Blank input is not an error and does not touch the sources. Unknown
    /// merchants come back as [`QueryOutcome::NotFound`]; load and parse
    /// failures are returned as errors.
    pub fn analyze<M: MarkerChooser>(&self, query: &str, markers: &mut M) -> Result<QueryOutcome> {
        let code = normalize_merchant_code(query);
        if code.is_empty() {
            return Ok(QueryOutcome::AwaitingInput);
        }

        let dataset = self.dataset()?;
        let comparison = match compare_merchant(&dataset, &code) {
            Ok(comparison) => comparison,
            Err(PlaybookError::MerchantNotFound(code)) => {
                info!("No merchant registered under {}", code);
                return Ok(QueryOutcome::NotFound { code });
            }
            Err(e) => return Err(e),
        };

        info!("Selected merchant: {}", comparison.display_name);
        let prompts = select_strategies(&comparison.merchant, &comparison.population, markers);

        let analysis = MerchantAnalysis::new(comparison, prompts);
        Ok(QueryOutcome::Ready(Box::new(analysis)))
    }

    pub async fn narrate<R>(&self, renderer: &R, prompts: &[StrategyPrompt]) -> NarrativeReport
    where
        R: NarrativeRenderer + ?Sized,
    {
        render_narratives(renderer, prompts, self.config.narrative_timeout()).await
    }
}
