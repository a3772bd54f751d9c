//! Vision model access: provider trait, HTTP client and call throttling.

mod client;
mod prompts;
mod throttle;

pub use client::{Auth, Endpoint, VisionClient, png_data_url};
pub use prompts::{parse_field_answer, parse_page_answer};
pub use throttle::Throttle;

use image::RgbaImage;

use crate::fields::Field;

/// Raw candidates returned by a full-page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCandidates {
    /// Date strings as the model wrote them.
    pub dates: Vec<String>,
    /// CUIT/CUIL strings as the model wrote them.
    pub cuits: Vec<String>,
}

/// Extracts field values from page images.
///
/// Implementations never fail: every error resolves to "not found".
/// Returned strings are unvalidated.
#[allow(async_fn_in_trait)]
pub trait VisionProvider {
    /// Read a single field from a cropped region.
    async fn extract_field(&self, image: &RgbaImage, field: Field) -> Option<String>;

    /// Read every date and CUIT/CUIL visible on a full page.
    async fn extract_all(&self, image: &RgbaImage) -> PageCandidates;
}

/// An absent provider finds nothing.
impl<P: VisionProvider> VisionProvider for Option<P> {
    async fn extract_field(&self, image: &RgbaImage, field: Field) -> Option<String> {
        match self {
            Some(provider) => provider.extract_field(image, field).await,
            None => None,
        }
    }

    async fn extract_all(&self, image: &RgbaImage) -> PageCandidates {
        match self {
            Some(provider) => provider.extract_all(image).await,
            None => PageCandidates::default(),
        }
    }
}
