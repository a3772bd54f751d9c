//! Shared fixtures for integration tests.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use pdffields_core::{Field, PageCandidates, VisionProvider};

/// Write a text-layer PDF with one page per entry, one text object per line.
pub fn write_text_pdf(path: &Path, pages: &[&[&str]]) {
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
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
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

    doc.save(path).unwrap();
}

/// Provider that answers nothing and counts how often it was asked.
#[derive(Clone, Default)]
pub struct CountingProvider {
    pub calls: Rc<Cell<usize>>,
}

impl VisionProvider for CountingProvider {
    async fn extract_field(&self, _image: &RgbaImage, _field: Field) -> Option<String> {
        self.calls.set(self.calls.get() + 1);
        None
    }

    async fn extract_all(&self, _image: &RgbaImage) -> PageCandidates {
        self.calls.set(self.calls.get() + 1);
        PageCandidates::default()
    }
}
