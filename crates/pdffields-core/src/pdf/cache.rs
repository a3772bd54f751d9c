//! Last rendered page bitmap, shared by the crops taken from that page.

use std::cell::RefCell;

use image::RgbaImage;

use super::Result;
use crate::geometry::{Rect, crop_to_rect};

/// Holds one page bitmap keyed by page index and zoom.
#[derive(Default)]
pub(crate) struct PageBitmapCache {
    entry: RefCell<Option<(usize, u32, RgbaImage)>>,
}

impl PageBitmapCache {
    /// Crop `clip` out of page `page` at `zoom`, calling `render` only when
    /// the held bitmap is for another page or zoom.
    pub(crate) fn crop<F>(&self, page: usize, zoom: f32, clip: &Rect, render: F) -> Result<RgbaImage>
    where
        F: FnOnce() -> Result<RgbaImage>,
    {
        let key = (page, zoom.to_bits());
        if let Some((held_page, held_zoom, image)) = self.entry.borrow().as_ref() {
            if (*held_page, *held_zoom) == key {
                return Ok(crop_to_rect(image, clip, zoom));
            }
        }

        let image = render()?;
        let cropped = crop_to_rect(&image, clip, zoom);
        *self.entry.borrow_mut() = Some((page, key.1, image));
        Ok(cropped)
    }
}
