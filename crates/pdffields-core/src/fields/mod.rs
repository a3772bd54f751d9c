//! Field definitions and validation.

pub mod rules;

use serde::{Deserialize, Serialize};

use crate::models::config::DateConfig;
use rules::{CuitExtractor, DateExtractor, FieldExtractor, SEARCH_TERMS_CUIT, SEARCH_TERMS_FECHA};

/// The two fields pulled out of every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Visit date.
    Fecha,
    /// CUIT/CUIL.
    Cuit,
}

impl Field {
    /// Key used in prompts and JSON answers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Fecha => "fecha",
            Field::Cuit => "cuit",
        }
    }

    /// Label variants searched on the page for this field.
    pub fn search_terms(&self) -> &'static [&'static str] {
        match self {
            Field::Fecha => SEARCH_TERMS_FECHA,
            Field::Cuit => SEARCH_TERMS_CUIT,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validators for both fields, configured once per run.
pub struct Validators {
    date: DateExtractor,
    cuit: CuitExtractor,
}

impl Validators {
    pub fn new(dates: &DateConfig) -> Self {
        Self {
            date: DateExtractor::new(dates.min_year, dates.max_year),
            cuit: CuitExtractor::new(),
        }
    }

    /// Extractor responsible for `field`.
    pub fn extractor(&self, field: Field) -> &dyn FieldExtractor {
        match field {
            Field::Fecha => &self.date,
            Field::Cuit => &self.cuit,
        }
    }

    /// Validate a candidate value for `field`.
    pub fn normalize(&self, field: Field, text: &str) -> Option<String> {
        self.extractor(field).extract(text)
    }
}

impl Default for Validators {
    fn default() -> Self {
        Self::new(&DateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        assert_eq!(Field::Fecha.as_str(), "fecha");
        assert_eq!(Field::Cuit.to_string(), "cuit");
        assert!(Field::Cuit.search_terms().contains(&"CUIL:"));
        assert_eq!(Field::Fecha.search_terms()[0], "Fecha de visita");
    }

    #[test]
    fn test_validators_dispatch() {
        let validators = Validators::default();
        assert_eq!(validators.normalize(Field::Fecha, "1/1/2024"), None);
        assert_eq!(
            validators.normalize(Field::Fecha, "visita 01/01/24"),
            Some("01/01/2024".to_string())
        );
        assert_eq!(
            validators.normalize(Field::Cuit, "20123456786"),
            Some("20-12345678-6".to_string())
        );
        assert_eq!(validators.normalize(Field::Cuit, "01/01/24"), None);
    }
}
