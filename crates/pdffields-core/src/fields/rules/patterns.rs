//! Common regex patterns and label variants for field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // DD?MM?YY or DD?MM?YYYY with an optional single non-digit separator
    pub static ref DATE_STRICT: Regex = Regex::new(
        r"\b(\d{2})\D?(\d{2})\D?(\d{2}|\d{4})\b"
    ).unwrap();

    // CUIT/CUIL: 2 + 8 + 1 digits, optional separators
    pub static ref CUIT_PATTERN: Regex = Regex::new(
        r"\b(\d{2})\D?(\d{8})\D?(\d)\b"
    ).unwrap();
}

/// Labels printed next to the visit date.
pub const SEARCH_TERMS_FECHA: &[&str] = &[
    "Fecha de visita",
    "FECHA DE VISITA",
    "fecha de visita",
    "Fecha:",
    "FECHA:",
    "fecha:",
    "Fecha",
    "FECHA",
    "fecha",
];

/// Labels printed next to the tax identifier.
pub const SEARCH_TERMS_CUIT: &[&str] = &[
    "CUIT",
    "C.U.I.T",
    "C.U.I.T.",
    "Nº CUIT",
    "N° CUIT",
    "CUIL",
    "C.U.I.L",
    "C.U.I.L.",
    "C.U.I.L:",
    "CUIL:",
];
