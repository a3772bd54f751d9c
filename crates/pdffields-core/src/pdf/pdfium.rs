//! Full-capability PDF access through PDFium.

use std::path::Path;

use image::RgbaImage;
use pdfium_render::prelude::*;
use tracing::{debug, trace};

use super::cache::PageBitmapCache;
use super::{PageSource, PdfBackend, Result};
use crate::error::PdfError;
use crate::geometry::Rect;

/// Backend bound to the PDFium shared library.
pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    /// Bind PDFium from the working directory, then from system paths.
    pub fn bind() -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| PdfError::Backend(format!("failed to load PDFium library: {:?}", e)))?;

        debug!("Bound PDFium library");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PdfBackend for PdfiumBackend {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn PageSource + 'a>> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| PdfError::Parse(format!("{:?}", e)))?;
        Ok(Box::new(PdfiumDocument {
            document,
            bitmaps: PageBitmapCache::default(),
        }))
    }
}

/// A document opened by PDFium.
///
/// Anchored crops of one page share a single rendered bitmap.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    bitmaps: PageBitmapCache,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>> {
        let page_index = PdfPageIndex::try_from(index).map_err(|_| PdfError::InvalidPage(index))?;
        self.document
            .pages()
            .get(page_index)
            .map_err(|_| PdfError::InvalidPage(index))
    }

    fn render_page(&self, index: usize, zoom: f32) -> Result<RgbaImage> {
        let page = self.page(index)?;
        let config = PdfRenderConfig::new().scale_page_by_factor(zoom);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PdfError::Render(format!("{:?}", e)))?;

        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        trace!("Rendered page {} at {}x{}", index, width, height);
        RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
            .ok_or_else(|| PdfError::Render(format!("bitmap size mismatch for {}x{}", width, height)))
    }
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, page: usize) -> Result<String> {
        let page = self.page(page)?;
        let text = page
            .text()
            .map_err(|e| PdfError::TextExtraction(format!("{:?}", e)))?;
        Ok(text.all())
    }

    fn page_bounds(&self, page: usize) -> Result<Rect> {
        let page = self.page(page)?;
        Ok(Rect::new(0.0, 0.0, page.width().value, page.height().value))
    }

    fn search(&self, index: usize, term: &str) -> Result<Vec<Rect>> {
        let page = self.page(index)?;
        let height = page.height().value;
        let text = page.text().map_err(|e| PdfError::Search(format!("{:?}", e)))?;
        let search = text
            .search(term, &PdfSearchOptions::new())
            .map_err(|e| PdfError::Search(format!("{:?}", e)))?;

        // PDFium reports bottom-left origin boxes; flip to top-left.
        let mut rects = Vec::new();
        for segments in search.iter(PdfSearchDirection::SearchForward) {
            for segment in segments.iter() {
                let bounds = segment.bounds();
                rects.push(Rect::new(
                    bounds.left().value,
                    height - bounds.top().value,
                    bounds.right().value,
                    height - bounds.bottom().value,
                ));
            }
        }

        trace!("Found {} hits for {:?} on page {}", rects.len(), term, index);
        Ok(rects)
    }

    fn render(&self, page: usize, clip: Option<&Rect>, zoom: f32) -> Result<RgbaImage> {
        match clip {
            Some(rect) => self.bitmaps.crop(page, zoom, rect, || self.render_page(page, zoom)),
            None => self.render_page(page, zoom),
        }
    }
}
