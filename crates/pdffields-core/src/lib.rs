//! Core library for visit date and CUIT/CUIL extraction from PDFs.
//!
//! This crate provides:
//! - PDF access (text layer, label search, rasterization)
//! - Date and CUIT/CUIL validation rules
//! - A throttled vision model client for scanned pages
//! - The per-page cascade, per-document selection and folder batch
//! - CSV and XLSX reports

pub mod error;
pub mod extract;
pub mod fields;
pub mod geometry;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod report;
pub mod vision;

pub use error::{FieldsError, Result};
pub use extract::{DocumentExtractor, PageExtractor};
pub use fields::{Field, Validators};
pub use models::config::{FieldsConfig, ProviderKind, Settings};
pub use models::results::{DocumentResult, PageResult, ReportRow};
pub use pdf::{PageSource, PdfBackend, default_backend};
pub use pipeline::{FolderPipeline, RunObserver, RunOutput};
pub use vision::{PageCandidates, VisionClient, VisionProvider};
