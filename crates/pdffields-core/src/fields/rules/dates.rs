//! Visit date normalization and selection.

use chrono::NaiveDate;

use super::FieldExtractor;
use super::patterns::DATE_STRICT;

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Date field extractor bounded by a plausible year range.
pub struct DateExtractor {
    min_year: i32,
    max_year: i32,
}

impl DateExtractor {
    pub fn new(min_year: i32, max_year: i32) -> Self {
        Self { min_year, max_year }
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new(1990, 2100)
    }
}

impl FieldExtractor for DateExtractor {
    fn extract(&self, text: &str) -> Option<String> {
        normalize_date_textlike(text, self.min_year, self.max_year)
    }
}

/// Normalize day, month and year strings into `DD/MM/YYYY`.
///
/// Only the ranges are checked (day 1-31, month 1-12), not month lengths, so
/// `31/02/2024` is accepted here and dropped later by
/// [`pick_closest_past_date`]. Two-digit years map to 2000+YY.
pub fn normalize_date(dd: &str, mm: &str, yy: &str, min_year: i32, max_year: i32) -> Option<String> {
    let day: u32 = dd.trim().parse().ok()?;
    let month: u32 = mm.trim().parse().ok()?;
    let mut year: i32 = yy.trim().parse().ok()?;

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    if yy.trim().chars().count() == 2 {
        year += 2000;
    }
    if year < min_year || year > max_year {
        return None;
    }

    Some(format!("{:02}/{:02}/{:04}", day, month, year))
}

/// Find the first date-shaped token in free text and normalize it.
///
/// Later matches are not tried when the first one fails normalization.
pub fn normalize_date_textlike(text: &str, min_year: i32, max_year: i32) -> Option<String> {
    let caps = DATE_STRICT.captures(text)?;
    normalize_date(&caps[1], &caps[2], &caps[3], min_year, max_year)
}

/// Pick the latest calendar date that is not after `today`.
pub fn pick_closest_past_date<S: AsRef<str>>(dates: &[S], today: NaiveDate) -> Option<String> {
    dates
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d.as_ref(), DATE_FORMAT).ok())
        .filter(|d| *d <= today)
        .max()
        .map(|d| d.format(DATE_FORMAT).to_string())
}
