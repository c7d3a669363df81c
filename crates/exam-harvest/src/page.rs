//! Scrape one target: fetch the page, then run the extractors over it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::extract::{self, ExtractionProfile};
use crate::fetch::Fetcher;
use crate::types::{HarvestResult, QuestionRecord, Target};

/// Anything that can turn a [`Target`] into a [`QuestionRecord`].
///
/// The batch runner is written against this trait so alternate sources
/// (fixtures, caches) can stand in for live fetching.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn scrape(&self, target: &Target) -> HarvestResult<QuestionRecord>;
}

/// Fetcher plus extraction pipeline for a single page.
#[derive(Clone)]
pub struct PageScraper {
    fetcher: Fetcher,
    max_retries: u32,
    delay: Duration,
    profile: ExtractionProfile,
}

impl PageScraper {
    pub fn new(
        fetcher: Fetcher,
        max_retries: u32,
        delay: Duration,
        profile: ExtractionProfile,
    ) -> Self {
        Self {
            fetcher,
            max_retries,
            delay,
            profile,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> HarvestResult<Self> {
        Ok(Self::new(
            Fetcher::new(config.timeout())?,
            config.max_retries,
            config.delay(),
            config.profile,
        ))
    }

    pub fn profile(&self) -> ExtractionProfile {
        self.profile
    }

    /// Scrape `target`. Never fails: a page that cannot be fetched yields a
    /// record carrying only the target's identifiers.
    pub async fn scrape_target(&self, target: &Target) -> QuestionRecord {
        let mut record = QuestionRecord::for_target(target);

        match self
            .fetcher
            .fetch(&target.link, self.max_retries, self.delay)
            .await
        {
            Ok(document) => {
                extract::extract_into(&mut record, &document, self.profile);
                info!(
                    topic = %target.topic,
                    question = %target.question,
                    found_text = record.question_text.is_found(),
                    options = record.options.len(),
                    "scraped question"
                );
            }
            Err(e) => {
                warn!(
                    topic = %target.topic,
                    question = %target.question,
                    error = %e,
                    "fetch failed, keeping empty record"
                );
            }
        }

        record
    }
}

#[async_trait]
impl QuestionSource for PageScraper {
    async fn scrape(&self, target: &Target) -> HarvestResult<QuestionRecord> {
        Ok(self.scrape_target(target).await)
    }
}
