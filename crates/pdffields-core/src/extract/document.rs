//! Whole-document extraction and final value selection.

use std::path::Path;

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use super::PageExtractor;
use crate::fields::Validators;
use crate::fields::rules::pick_closest_past_date;
use crate::models::config::RenderConfig;
use crate::models::results::{DocumentResult, dedup_preserving_order};
use crate::pdf::{PageSource, PdfBackend};
use crate::vision::VisionProvider;

/// Walks every page of a document and picks one date and one CUIT.
pub struct DocumentExtractor<'a, P> {
    pages: PageExtractor<'a, P>,
    today: NaiveDate,
}

impl<'a, P: VisionProvider> DocumentExtractor<'a, P> {
    pub fn new(provider: &'a P, validators: &'a Validators, render: &'a RenderConfig) -> Self {
        Self {
            pages: PageExtractor::new(provider, validators, render),
            today: Local::now().date_naive(),
        }
    }

    /// Use a fixed reference day instead of the local date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Open `path` and extract. Unopenable files give an empty result.
    pub async fn extract_file(&self, backend: &dyn PdfBackend, path: &Path) -> DocumentResult {
        let doc = match backend.open(path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Could not open {}: {}", path.display(), e);
                return DocumentResult::default();
            }
        };

        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.extract_document(doc.as_ref(), &name).await
    }

    /// Extract from an opened document. Failing pages are skipped.
    pub async fn extract_document(&self, doc: &dyn PageSource, name: &str) -> DocumentResult {
        let mut dates = Vec::new();
        let mut cuits = Vec::new();
        let mut vision_calls = 0;

        for index in 0..doc.page_count() {
            match self.pages.extract(doc, index).await {
                Ok(page) => {
                    vision_calls += page.vision_calls;
                    dates.extend(page.dates);
                    cuits.extend(page.cuits);
                }
                Err(e) => debug!("Page {} of {} failed: {}", index, name, e),
            }
        }

        let date = pick_closest_past_date(&dates, self.today);
        let cuits = dedup_preserving_order(cuits);
        if cuits.len() > 1 {
            debug!("{}: {} distinct CUITs, keeping the first", name, cuits.len());
        }

        debug!(
            "{}: {} pages, {} date candidates, {} vision calls",
            name,
            doc.page_count(),
            dates.len(),
            vision_calls
        );

        DocumentResult {
            date,
            cuit: cuits.into_iter().next(),
        }
    }
}
