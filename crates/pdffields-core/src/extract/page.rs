//! Three-tier extraction for a single page.

use tracing::{debug, trace};

use crate::fields::{Field, Validators};
use crate::geometry::{DEFAULT_DEDUP_TOLERANCE, Rect, clip_right_rect, dedup_rects, sort_reading_order};
use crate::models::config::RenderConfig;
use crate::models::results::PageResult;
use crate::pdf::{PageSource, Result};
use crate::vision::VisionProvider;

const FIELDS: [Field; 2] = [Field::Fecha, Field::Cuit];

/// Runs the embedded text, anchored crop and full-page passes on a page.
pub struct PageExtractor<'a, P> {
    provider: &'a P,
    validators: &'a Validators,
    render: &'a RenderConfig,
}

impl<'a, P: VisionProvider> PageExtractor<'a, P> {
    pub fn new(provider: &'a P, validators: &'a Validators, render: &'a RenderConfig) -> Self {
        Self {
            provider,
            validators,
            render,
        }
    }

    /// Extract both fields from page `index`.
    ///
    /// Stops as soon as each field has a value. Backend errors abort the page.
    pub async fn extract(&self, doc: &dyn PageSource, index: usize) -> Result<PageResult> {
        let mut result = PageResult::default();

        // Embedded text
        let text = doc.page_text(index)?;
        for field in FIELDS {
            if let Some(value) = self.validators.normalize(field, &text) {
                trace!("Page {}: {} from text layer", index, field);
                push(&mut result, field, value);
            }
        }

        if result.is_complete() {
            return Ok(result);
        }
        if !doc.can_render() {
            debug!("Page {}: backend cannot render, skipping vision passes", index);
            return Ok(result);
        }

        // Anchored crops
        let page_bounds = doc.page_bounds(index)?;
        let missing: Vec<Field> = FIELDS.into_iter().filter(|f| needs(&result, *f)).collect();

        let mut anchors = Vec::with_capacity(missing.len());
        for &field in &missing {
            anchors.push((field, self.find_anchors(doc, index, field)?));
        }

        for (field, rects) in anchors {
            for rect in rects.iter().take(self.render.max_rects_per_anchor) {
                let clip = clip_right_rect(&page_bounds, rect);
                if clip.is_empty() {
                    continue;
                }
                let image = doc.render(index, Some(&clip), self.render.zoom_clip)?;
                result.vision_calls += 1;

                let value = self
                    .provider
                    .extract_field(&image, field)
                    .await
                    .and_then(|raw| self.validators.normalize(field, &raw));
                if let Some(value) = value {
                    debug!("Page {}: {} from anchored crop", index, field);
                    push(&mut result, field, value);
                    break;
                }
            }
        }

        if result.is_complete() {
            return Ok(result);
        }

        // Full page
        let need_date = result.needs_date();
        let need_cuit = result.needs_cuit();
        let image = doc.render(index, None, self.render.zoom_full)?;
        result.vision_calls += 1;
        let candidates = self.provider.extract_all(&image).await;

        if need_date {
            for raw in &candidates.dates {
                if let Some(value) = self.validators.normalize(Field::Fecha, raw) {
                    result.push_date(value);
                }
            }
        }
        if need_cuit {
            for raw in &candidates.cuits {
                if let Some(value) = self.validators.normalize(Field::Cuit, raw) {
                    result.push_cuit(value);
                }
            }
        }

        debug!(
            "Page {}: full-page pass found {} dates, {} CUITs ({} vision calls)",
            index,
            result.dates.len(),
            result.cuits.len(),
            result.vision_calls
        );
        Ok(result)
    }

    /// Label hits for `field`, de-duplicated and in reading order.
    fn find_anchors(&self, doc: &dyn PageSource, index: usize, field: Field) -> Result<Vec<Rect>> {
        let mut hits = Vec::new();
        for term in field.search_terms() {
            hits.extend(doc.search(index, term)?);
        }

        let mut rects = dedup_rects(&hits, DEFAULT_DEDUP_TOLERANCE);
        sort_reading_order(&mut rects);
        trace!("Page {}: {} anchors for {}", index, rects.len(), field);
        Ok(rects)
    }
}

fn needs(result: &PageResult, field: Field) -> bool {
    match field {
        Field::Fecha => result.needs_date(),
        Field::Cuit => result.needs_cuit(),
    }
}

fn push(result: &mut PageResult, field: Field, value: String) {
    match field {
        Field::Fecha => result.push_date(value),
        Field::Cuit => result.push_cuit(value),
    }
}
