//! Page, document and report level results.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Values found on one page, de-duplicated in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// Normalized `DD/MM/YYYY` dates.
    pub dates: Vec<String>,
    /// Normalized `NN-NNNNNNNN-N` identifiers.
    pub cuits: Vec<String>,
    /// Vision calls issued while processing this page.
    pub vision_calls: usize,
}

impl PageResult {
    pub fn push_date(&mut self, date: String) {
        push_unique(&mut self.dates, date);
    }

    pub fn push_cuit(&mut self, cuit: String) {
        push_unique(&mut self.cuits, cuit);
    }

    pub fn needs_date(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn needs_cuit(&self) -> bool {
        self.cuits.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.needs_date() && !self.needs_cuit()
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Keep the first occurrence of every value, preserving order.
pub fn dedup_preserving_order<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Final values chosen for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentResult {
    /// Latest date not after the reference day.
    pub date: Option<String>,
    /// First distinct identifier in document order.
    pub cuit: Option<String>,
}

/// One line of the batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// File name (without directory).
    #[serde(rename = "archivo")]
    pub file_name: String,

    /// Chosen date or empty.
    #[serde(rename = "fecha_ddmmyyyy")]
    pub date: String,

    /// Chosen CUIT/CUIL or empty.
    pub cuit: String,
}

impl ReportRow {
    pub fn new(file_name: impl Into<String>, result: DocumentResult) -> Self {
        Self {
            file_name: file_name.into(),
            date: result.date.unwrap_or_default(),
            cuit: result.cuit.unwrap_or_default(),
        }
    }

    /// Column values in report order.
    pub fn columns(&self) -> [&str; 3] {
        [self.file_name.as_str(), self.date.as_str(), self.cuit.as_str()]
    }
}

/// Report column headers.
pub const REPORT_HEADERS: [&str; 3] = ["archivo", "fecha_ddmmyyyy", "cuit"];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_result_dedup() {
        let mut page = PageResult::default();
        assert!(page.needs_date() && page.needs_cuit());

        page.push_date("01/02/2024".to_string());
        page.push_date("01/02/2024".to_string());
        page.push_date("03/04/2024".to_string());
        assert_eq!(page.dates, vec!["01/02/2024", "03/04/2024"]);
        assert!(!page.is_complete());

        page.push_cuit("20-12345678-6".to_string());
        assert!(page.is_complete());
    }

    #[test]
    fn test_dedup_preserving_order() {
        let values = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(dedup_preserving_order(values), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_report_row_empty_fields() {
        let row = ReportRow::new("x.pdf", DocumentResult::default());
        assert_eq!(row.columns(), ["x.pdf", "", ""]);
    }
}
