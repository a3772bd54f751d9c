//! CUIT/CUIL (Argentine tax identification number) extraction and validation.

use super::FieldExtractor;
use super::patterns::CUIT_PATTERN;

/// CUIT field extractor.
pub struct CuitExtractor;

impl CuitExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CuitExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for CuitExtractor {
    fn extract(&self, text: &str) -> Option<String> {
        normalize_cuit_textlike(text)
    }
}

/// Compute the CUIT check digit for an 11-digit string.
///
/// Weights: 5, 4, 3, 2, 7, 6, 5, 4, 3, 2 over the first ten digits.
/// The digit is `11 - sum % 11`, with 11 mapped to 0 and 10 mapped to 9.
pub fn cuit_check_digit(n11: &str) -> Option<u32> {
    if n11.len() != 11 || !n11.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let weights = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];
    let sum: u32 = n11
        .bytes()
        .take(10)
        .zip(weights.iter())
        .map(|(b, w)| u32::from(b - b'0') * w)
        .sum();

    let dv = match 11 - (sum % 11) {
        11 => 0,
        10 => 9,
        dv => dv,
    };
    Some(dv)
}

/// Find the first CUIT-shaped token and return it as `NN-NNNNNNNN-N` when
/// its check digit is valid.
pub fn normalize_cuit_textlike(text: &str) -> Option<String> {
    let caps = CUIT_PATTERN.captures(text)?;
    let (p1, p2, p3) = (&caps[1], &caps[2], &caps[3]);

    let dv = cuit_check_digit(&format!("{}{}{}", p1, p2, p3))?;
    if p3.parse::<u32>().ok()? != dv {
        return None;
    }

    Some(format!("{}-{}-{}", p1, p2, p3))
}
