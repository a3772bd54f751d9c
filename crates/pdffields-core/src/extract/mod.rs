//! Per-page cascade and per-document selection.

mod document;
mod page;

pub use document::DocumentExtractor;
pub use page::PageExtractor;

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use image::{Rgba, RgbaImage};

    use crate::error::PdfError;
    use crate::fields::Field;
    use crate::geometry::Rect;
    use crate::pdf::{PageSource, Result};
    use crate::vision::{PageCandidates, VisionProvider};

    /// In-memory document: fixed text per page, label hits shared by all pages.
    pub struct FakePage {
        texts: Vec<String>,
        hits: Vec<(String, Rect)>,
        can_render: bool,
        fail_render: bool,
        fail_text_on: Option<usize>,
        renders: RefCell<Vec<(Option<Rect>, f32)>>,
    }

    impl FakePage {
        pub fn new(text: &str) -> Self {
            Self::pages(&[text])
        }

        pub fn pages(texts: &[&str]) -> Self {
            Self {
                texts: texts.iter().map(|t| t.to_string()).collect(),
                hits: Vec::new(),
                can_render: true,
                fail_render: false,
                fail_text_on: None,
                renders: RefCell::new(Vec::new()),
            }
        }

        pub fn with_hit(mut self, term: &str, rect: Rect) -> Self {
            self.hits.push((term.to_string(), rect));
            self
        }

        pub fn text_only(mut self) -> Self {
            self.can_render = false;
            self
        }

        pub fn failing_render(mut self) -> Self {
            self.fail_render = true;
            self
        }

        pub fn failing_text_on(mut self, page: usize) -> Self {
            self.fail_text_on = Some(page);
            self
        }

        pub fn renders(&self) -> usize {
            self.renders.borrow().len()
        }

        /// `(clip, zoom)` of every successful render, in call order.
        pub fn render_calls(&self) -> Vec<(Option<Rect>, f32)> {
            self.renders.borrow().clone()
        }
    }

    impl PageSource for FakePage {
        fn page_count(&self) -> usize {
            self.texts.len()
        }

        fn page_text(&self, page: usize) -> Result<String> {
            if self.fail_text_on == Some(page) {
                return Err(PdfError::TextExtraction("broken page".to_string()));
            }
            self.texts.get(page).cloned().ok_or(PdfError::InvalidPage(page))
        }

        fn page_bounds(&self, _page: usize) -> Result<Rect> {
            Ok(Rect::new(0.0, 0.0, 612.0, 792.0))
        }

        fn search(&self, _page: usize, term: &str) -> Result<Vec<Rect>> {
            Ok(self
                .hits
                .iter()
                .filter(|(t, _)| t == term)
                .map(|(_, r)| *r)
                .collect())
        }

        fn render(&self, _page: usize, clip: Option<&Rect>, zoom: f32) -> Result<RgbaImage> {
            if self.fail_render {
                return Err(PdfError::Render("boom".to_string()));
            }
            self.renders.borrow_mut().push((clip.copied(), zoom));
            Ok(RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255])))
        }

        fn can_render(&self) -> bool {
            self.can_render
        }
    }

    /// Scripted provider answering the same way every time.
    #[derive(Default)]
    pub struct FakeProvider {
        fields: HashMap<Field, String>,
        page: PageCandidates,
        field_requests: RefCell<Vec<Field>>,
        page_requests: Cell<usize>,
    }

    impl FakeProvider {
        pub fn with_field(mut self, field: Field, answer: &str) -> Self {
            self.fields.insert(field, answer.to_string());
            self
        }

        pub fn with_page(mut self, page: PageCandidates) -> Self {
            self.page = page;
            self
        }

        pub fn field_requests(&self) -> Vec<Field> {
            self.field_requests.borrow().clone()
        }

        pub fn page_requests(&self) -> usize {
            self.page_requests.get()
        }

        pub fn calls(&self) -> usize {
            self.field_requests.borrow().len() + self.page_requests.get()
        }
    }

    impl VisionProvider for FakeProvider {
        async fn extract_field(&self, _image: &RgbaImage, field: Field) -> Option<String> {
            self.field_requests.borrow_mut().push(field);
            self.fields.get(&field).cloned()
        }

        async fn extract_all(&self, _image: &RgbaImage) -> PageCandidates {
            self.page_requests.set(self.page_requests.get() + 1);
            self.page.clone()
        }
    }
}
