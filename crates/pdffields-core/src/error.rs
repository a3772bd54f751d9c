//! Error types for the pdffields-core library.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the pdffields library.
#[derive(Error, Debug)]
pub enum FieldsError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Vision provider error.
    #[error("vision error: {0}")]
    Vision(#[from] VisionError),

    /// Report writing error.
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The PDF engine could not be initialised.
    #[error("PDF backend unavailable: {0}")]
    Backend(String),

    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from a page.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Text search on a page failed.
    #[error("text search failed: {0}")]
    Search(String),

    /// Failed to render a page.
    #[error("failed to render page: {0}")]
    Render(String),

    /// The backend has no rasterizer.
    #[error("rendering is not supported by the {0} backend")]
    RenderUnsupported(&'static str),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// Invalid page index requested.
    #[error("invalid page index: {0}")]
    InvalidPage(usize),
}

/// Errors from a single vision API call.
#[derive(Error, Debug)]
pub enum VisionError {
    /// The service asked us to slow down.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Suggested wait, when the service sent one.
        retry_after: Option<Duration>,
    },

    /// Network or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status other than 429.
    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body did not have the chat completion shape.
    #[error("unexpected response: {0}")]
    Response(String),

    /// Image could not be encoded for upload.
    #[error("image encoding failed: {0}")]
    Encode(String),

    /// Required endpoint settings are missing.
    #[error("missing credentials: {0}")]
    Credentials(String),
}

impl VisionError {
    /// Whether this failure is a rate-limit signal.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, VisionError::RateLimited { .. })
    }

    /// Structured wait hint carried by a rate-limit failure.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            VisionError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Errors while writing CSV/XLSX reports.
#[derive(Error, Debug)]
pub enum ReportError {
    /// CSV writer failure.
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    /// XLSX writer failure.
    #[error("XLSX write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Result type for the pdffields library.
pub type Result<T> = std::result::Result<T, FieldsError>;
