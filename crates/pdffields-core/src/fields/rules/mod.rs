//! Rule-based field validators.

pub mod cuit;
pub mod dates;
pub mod patterns;

pub use cuit::{cuit_check_digit, normalize_cuit_textlike, CuitExtractor};
pub use dates::{normalize_date, normalize_date_textlike, pick_closest_past_date, DateExtractor};
pub use patterns::{SEARCH_TERMS_CUIT, SEARCH_TERMS_FECHA};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// Extract and normalize the first occurrence of the field, if valid.
    fn extract(&self, text: &str) -> Option<String>;
}
