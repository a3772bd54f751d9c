//! Text-only PDF access using lopdf.
//!
//! Used when PDFium is not available. Only the embedded text pass can run
//! against these documents: search finds nothing and rendering fails.

use std::path::Path;

use image::RgbaImage;
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use super::{PageSource, PdfBackend, Result};
use crate::error::PdfError;
use crate::geometry::Rect;

/// A4 portrait, used when a page carries no usable MediaBox.
const FALLBACK_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 595.0, 842.0];

/// Backend opening documents with lopdf.
#[derive(Debug, Default)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for LopdfBackend {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn PageSource + 'a>> {
        let data = std::fs::read(path).map_err(|e| PdfError::Parse(e.to_string()))?;
        Ok(Box::new(LopdfDocument::load(&data)?))
    }

    fn can_render(&self) -> bool {
        false
    }
}

/// A document loaded with lopdf.
pub struct LopdfDocument {
    document: Document,
    page_ids: Vec<(u32, ObjectId)>,
}

impl LopdfDocument {
    /// Parse a PDF from bytes, decrypting empty-password files.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let page_ids: Vec<(u32, ObjectId)> = document.get_pages().into_iter().collect();
        debug!("Loaded PDF with {} pages", page_ids.len());

        Ok(Self { document, page_ids })
    }

    fn page_entry(&self, page: usize) -> Result<(u32, ObjectId)> {
        self.page_ids
            .get(page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    /// Find MediaBox on the page or its ancestors.
    fn media_box(&self, node_id: ObjectId) -> Option<[f32; 4]> {
        let dict = self.document.get_object(node_id).ok()?.as_dict().ok()?;

        if let Ok(media_box) = dict.get(b"MediaBox") {
            if let Ok((_, Object::Array(values))) = self.document.dereference(media_box) {
                let numbers: Vec<f32> = values.iter().filter_map(|v| v.as_float().ok()).collect();
                if let [x0, y0, x1, y1] = numbers[..] {
                    return Some([x0, y0, x1, y1]);
                }
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.media_box(*parent_id),
            _ => None,
        }
    }
}

impl PageSource for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_text(&self, page: usize) -> Result<String> {
        let (number, _) = self.page_entry(page)?;
        self.document
            .extract_text(&[number])
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn page_bounds(&self, page: usize) -> Result<Rect> {
        let (_, page_id) = self.page_entry(page)?;
        let [x0, y0, x1, y1] = self.media_box(page_id).unwrap_or(FALLBACK_MEDIA_BOX);
        Ok(Rect::new(0.0, 0.0, (x1 - x0).abs(), (y1 - y0).abs()))
    }

    fn search(&self, page: usize, _term: &str) -> Result<Vec<Rect>> {
        self.page_entry(page)?;
        Ok(Vec::new())
    }

    fn render(&self, _page: usize, _clip: Option<&Rect>, _zoom: f32) -> Result<RgbaImage> {
        Err(PdfError::RenderUnsupported("lopdf"))
    }

    fn can_render(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    /// Build a PDF with one page per entry, each line drawn as its own text object.
    fn text_pdf(pages: &[&[&str]]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in pages {
            let mut operations = Vec::new();
            for (i, line) in lines.iter().enumerate() {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
                operations.push(Operation::new("Td", vec![72.into(), (720 - 20 * i as i64).into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(format!("{} ", line))]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_page_text_and_bounds() {
        let data = text_pdf(&[&["Fecha de visita: 15/06/2023"], &["CUIT: 20-12345678-6"]]);
        let doc = LopdfDocument::load(&data).unwrap();

        assert_eq!(doc.page_count(), 2);
        assert!(doc.page_text(0).unwrap().contains("15/06/2023"));
        assert!(doc.page_text(1).unwrap().contains("20-12345678-6"));
        assert_eq!(doc.page_bounds(0).unwrap(), Rect::new(0.0, 0.0, 612.0, 792.0));
    }

    #[test]
    fn test_text_only_capabilities() {
        let data = text_pdf(&[&["CUIT"]]);
        let doc = LopdfDocument::load(&data).unwrap();

        assert!(!doc.can_render());
        assert!(doc.search(0, "CUIT").unwrap().is_empty());
        assert!(matches!(doc.render(0, None, 1.0), Err(PdfError::RenderUnsupported(_))));
        assert!(matches!(doc.page_text(5), Err(PdfError::InvalidPage(5))));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(LopdfDocument::load(b"not a pdf"), Err(PdfError::Parse(_))));
    }
}
