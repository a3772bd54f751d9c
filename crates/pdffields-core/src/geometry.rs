//! Page geometry: anchor rectangles and crop regions.
//!
//! Coordinates are PDF points with the origin at the top-left corner of the
//! page and y growing downward.

use image::{RgbaImage, imageops};
use serde::{Deserialize, Serialize};

/// Anchor boxes closer than this on every edge are the same anchor.
pub const DEFAULT_DEDUP_TOLERANCE: f32 = 1.0;

const RIGHT_WIDTH_FACTOR: f32 = 6.0;
const EXTRA_TOP_FACTOR: f32 = 0.5;
const EXTRA_BOTTOM_FACTOR: f32 = 2.5;

/// Axis-aligned rectangle (x0, y0) - (x1, y1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Get the width of the rectangle.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Get the height of the rectangle.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Check if the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// All four edges within `tolerance` (exclusive) of `other`.
    pub fn near(&self, other: &Rect, tolerance: f32) -> bool {
        (self.x0 - other.x0).abs() < tolerance
            && (self.y0 - other.y0).abs() < tolerance
            && (self.x1 - other.x1).abs() < tolerance
            && (self.y1 - other.y1).abs() < tolerance
    }
}

/// Drop rectangles that are near-identical to one kept earlier.
pub fn dedup_rects(rects: &[Rect], tolerance: f32) -> Vec<Rect> {
    let mut unique: Vec<Rect> = Vec::with_capacity(rects.len());
    for rect in rects {
        if !unique.iter().any(|u| rect.near(u, tolerance)) {
            unique.push(*rect);
        }
    }
    unique
}

/// Sort top-to-bottom, then left-to-right.
pub fn sort_reading_order(rects: &mut [Rect]) {
    rects.sort_by(|a, b| a.y0.total_cmp(&b.y0).then(a.x0.total_cmp(&b.x0)));
}

/// Region to the right of a label where its value is usually printed.
///
/// Extends 6x the label width to the right, half a label height above and
/// two and a half below, clamped to the page.
pub fn clip_right_rect(page: &Rect, rect: &Rect) -> Rect {
    let right_width = rect.width() * RIGHT_WIDTH_FACTOR;
    let extra_top = rect.height() * EXTRA_TOP_FACTOR;
    let extra_bottom = rect.height() * EXTRA_BOTTOM_FACTOR;

    Rect::new(
        rect.x1,
        (rect.y0 - extra_top).max(page.y0),
        (rect.x1 + right_width).min(page.x1),
        (rect.y1 + extra_bottom).min(page.y1),
    )
}

/// Crop a page bitmap rendered at `zoom` down to `rect` (page points).
///
/// The pixel box is clamped to the bitmap; an empty intersection yields a
/// 1x1 image rather than an error.
pub fn crop_to_rect(image: &RgbaImage, rect: &Rect, zoom: f32) -> RgbaImage {
    let (width, height) = image.dimensions();

    let to_px = |v: f32, max: u32| -> u32 { ((v * zoom).max(0.0) as u32).min(max) };
    let left = to_px(rect.x0, width);
    let top = to_px(rect.y0, height);
    let right = to_px(rect.x1.ceil(), width).max(left);
    let bottom = to_px(rect.y1.ceil(), height).max(top);

    let w = (right - left).max(1).min(width.saturating_sub(left).max(1));
    let h = (bottom - top).max(1).min(height.saturating_sub(top).max(1));

    imageops::crop_imm(image, left.min(width.saturating_sub(1)), top.min(height.saturating_sub(1)), w, h)
        .to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dedup_within_tolerance() {
        let a = Rect::new(10.0, 20.0, 50.0, 30.0);
        let b = Rect::new(10.4, 20.3, 50.9, 29.5);
        assert_eq!(dedup_rects(&[a, b], DEFAULT_DEDUP_TOLERANCE), vec![a]);
    }

    #[test]
    fn test_dedup_beyond_tolerance() {
        let a = Rect::new(10.0, 20.0, 50.0, 30.0);
        let b = Rect::new(10.0, 20.0, 51.5, 30.0);
        assert_eq!(dedup_rects(&[a, b], DEFAULT_DEDUP_TOLERANCE), vec![a, b]);

        // Exactly on the tolerance is not a duplicate.
        let c = Rect::new(11.0, 20.0, 50.0, 30.0);
        assert_eq!(dedup_rects(&[a, c], DEFAULT_DEDUP_TOLERANCE), vec![a, c]);
    }

    #[test]
    fn test_dedup_preserves_order() {
        let a = Rect::new(0.0, 100.0, 10.0, 110.0);
        let b = Rect::new(0.0, 10.0, 10.0, 20.0);
        let a2 = Rect::new(0.5, 100.5, 10.5, 110.5);
        assert_eq!(dedup_rects(&[a, b, a2], 1.0), vec![a, b]);
    }

    #[test]
    fn test_sort_reading_order() {
        let low = Rect::new(0.0, 200.0, 10.0, 210.0);
        let top_right = Rect::new(300.0, 50.0, 310.0, 60.0);
        let top_left = Rect::new(20.0, 50.0, 30.0, 60.0);
        let mut rects = vec![low, top_right, top_left];
        sort_reading_order(&mut rects);
        assert_eq!(rects, vec![top_left, top_right, low]);
    }

    #[test]
    fn test_clip_right_rect() {
        let page = Rect::new(0.0, 0.0, 600.0, 800.0);
        let label = Rect::new(50.0, 100.0, 90.0, 110.0);
        assert_eq!(clip_right_rect(&page, &label), Rect::new(90.0, 95.0, 330.0, 135.0));
    }

    #[test]
    fn test_clip_right_rect_clamped() {
        let page = Rect::new(0.0, 0.0, 600.0, 800.0);
        let label = Rect::new(500.0, 2.0, 560.0, 12.0);
        let clip = clip_right_rect(&page, &label);
        assert_eq!(clip, Rect::new(560.0, 0.0, 600.0, 37.0));

        let bottom = Rect::new(10.0, 790.0, 20.0, 798.0);
        assert_eq!(clip_right_rect(&page, &bottom).y1, 800.0);
    }

    #[test]
    fn test_crop_to_rect_scales_by_zoom() {
        let image = RgbaImage::new(200, 100);
        let crop = crop_to_rect(&image, &Rect::new(10.0, 5.0, 30.0, 25.0), 2.0);
        assert_eq!(crop.dimensions(), (40, 40));
    }

    #[test]
    fn test_crop_to_rect_clamps() {
        let image = RgbaImage::new(100, 100);
        let crop = crop_to_rect(&image, &Rect::new(40.0, 40.0, 80.0, 80.0), 2.0);
        assert_eq!(crop.dimensions(), (20, 20));

        let outside = crop_to_rect(&image, &Rect::new(200.0, 200.0, 300.0, 300.0), 1.0);
        assert_eq!(outside.dimensions(), (1, 1));
    }
}
