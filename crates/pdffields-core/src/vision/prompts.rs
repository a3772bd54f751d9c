//! Prompt texts and answer parsing.

use serde_json::Value;
use tracing::trace;

use super::PageCandidates;
use crate::fields::Field;

pub(crate) const FIELD_SYSTEM: &str = "Devolvé SOLO JSON válido. Si no está el dato, devolvé {}.";

pub(crate) const PAGE_SYSTEM: &str = r#"Devolvé SOLO JSON válido: {"fechas":[], "cuits":[]}. No inventes."#;

pub(crate) const PAGE_USER: &str = "Detectá TODAS las fechas (DD/MM/YYYY; años 2 dígitos => 2000+YY) \
     y TODOS los CUIT/CUIL (NN-NNNNNNNN-N) visibles en la página.";

pub(crate) fn field_user_prompt(field: Field) -> String {
    format!(
        "Extraé \"{}\" si aparece en el recorte. \
         Formato fecha: \"DD/MM/YYYY\" (años de 2 dígitos => 2000+YY). \
         Para CUIT/CUIL: \"NN-NNNNNNNN-N\".",
        field.as_str()
    )
}

/// Read `{"<field>": value}` from a model answer.
///
/// Anything other than a non-empty string or a number is "not found".
pub fn parse_field_answer(content: &str, field: Field) -> Option<String> {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            trace!("Unparseable field answer: {}", e);
            return None;
        }
    };
    value.get(field.as_str()).and_then(scalar_to_string)
}

/// Read `{"fechas": [...], "cuits": [...]}` from a model answer.
pub fn parse_page_answer(content: &str) -> PageCandidates {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            trace!("Unparseable page answer: {}", e);
            return PageCandidates::default();
        }
    };

    PageCandidates {
        dates: string_list(value.get("fechas")),
        cuits: string_list(value.get("cuits")),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(other) => scalar_to_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}
