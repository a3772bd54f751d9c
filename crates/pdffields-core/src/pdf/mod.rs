//! PDF access: page text, label search and rasterization.

#[cfg(any(feature = "pdfium", test))]
mod cache;
mod lopdf_backend;
#[cfg(feature = "pdfium")]
mod pdfium;

pub use lopdf_backend::{LopdfBackend, LopdfDocument};
#[cfg(feature = "pdfium")]
pub use pdfium::{PdfiumBackend, PdfiumDocument};

use std::path::Path;

use image::RgbaImage;
use tracing::warn;

use crate::error::PdfError;
use crate::geometry::Rect;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// An opened document. Page indices are 0-based.
pub trait PageSource {
    /// Get the number of pages.
    fn page_count(&self) -> usize;

    /// Extract the embedded text layer of a page.
    fn page_text(&self, page: usize) -> Result<String>;

    /// Page bounds in points, origin top-left.
    fn page_bounds(&self, page: usize) -> Result<Rect>;

    /// Bounding boxes of every occurrence of `term` on a page.
    fn search(&self, page: usize, term: &str) -> Result<Vec<Rect>>;

    /// Render a page at `zoom`, optionally cropped to `clip` (page points).
    fn render(&self, page: usize, clip: Option<&Rect>, zoom: f32) -> Result<RgbaImage>;

    /// Whether [`render`](Self::render) and [`search`](Self::search) work.
    fn can_render(&self) -> bool {
        true
    }
}

/// Opens documents.
pub trait PdfBackend {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Open a PDF file.
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn PageSource + 'a>>;

    /// Whether opened documents can be searched and rendered at all.
    fn can_render(&self) -> bool {
        true
    }
}

/// PDFium when the shared library can be bound, lopdf text-only otherwise.
pub fn default_backend() -> Box<dyn PdfBackend> {
    #[cfg(feature = "pdfium")]
    {
        match PdfiumBackend::bind() {
            Ok(backend) => return Box::new(backend),
            Err(e) => warn!("{}; falling back to text-only extraction", e),
        }
    }
    #[cfg(not(feature = "pdfium"))]
    warn!("built without PDFium; using text-only extraction");

    Box::new(LopdfBackend::new())
}
