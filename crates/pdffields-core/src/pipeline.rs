//! Folder batch: list PDFs, extract each one, write the reports.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use glob::{MatchOptions, Pattern, glob_with};
use tracing::{debug, info, warn};

use crate::error::{FieldsError, Result};
use crate::extract::DocumentExtractor;
use crate::fields::Validators;
use crate::models::config::Settings;
use crate::models::results::ReportRow;
use crate::pdf::PdfBackend;
use crate::report;
use crate::vision::VisionProvider;

/// Receives progress while a folder is processed.
pub trait RunObserver {
    /// Called once, before the first file, with the number of files.
    fn on_start(&mut self, _total: usize) {}

    /// Called after each file.
    fn on_row(&mut self, _row: &ReportRow) {}
}

impl RunObserver for () {}

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// One row per processed file, in processing order.
    pub rows: Vec<ReportRow>,
    /// CSV report, when written.
    pub csv_path: Option<PathBuf>,
    /// XLSX report, when written.
    pub xlsx_path: Option<PathBuf>,
}

/// Sequential batch over the PDFs of one folder.
pub struct FolderPipeline<'a> {
    settings: &'a Settings,
    backend: &'a dyn PdfBackend,
    today: Option<NaiveDate>,
}

impl<'a> FolderPipeline<'a> {
    pub fn new(settings: &'a Settings, backend: &'a dyn PdfBackend) -> Self {
        Self {
            settings,
            backend,
            today: None,
        }
    }

    /// Reference day for date selection (defaults to the local date).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Process the folder.
    ///
    /// The provider is built only when there is at least one PDF and the
    /// backend can render pages; an empty folder returns an empty output and
    /// writes no reports.
    pub async fn run<P, F>(&self, make_provider: F, observer: &mut dyn RunObserver) -> Result<RunOutput>
    where
        P: VisionProvider,
        F: FnOnce(&Settings) -> Result<P>,
    {
        let settings = self.settings;
        std::fs::create_dir_all(&settings.out_dir)?;

        let files = list_pdfs(&settings.input_dir, settings.max_files)?;
        if files.is_empty() {
            warn!("No PDFs found in {}", settings.input_dir.display());
            return Ok(RunOutput::default());
        }

        info!(
            "Processing {} PDFs from {} ({} backend)",
            files.len(),
            settings.input_dir.display(),
            self.backend.name()
        );

        let provider = if self.backend.can_render() {
            Some(make_provider(settings)?)
        } else {
            info!("{} backend cannot render pages; vision calls disabled", self.backend.name());
            None
        };
        let validators = Validators::new(&settings.config.dates);
        let mut extractor = DocumentExtractor::new(&provider, &validators, &settings.config.render);
        if let Some(today) = self.today {
            extractor = extractor.with_today(today);
        }

        observer.on_start(files.len());
        let mut rows = Vec::with_capacity(files.len());
        for path in &files {
            debug!("Processing {}", path.display());
            let result = extractor.extract_file(self.backend, path).await;
            let row = ReportRow::new(file_name(path), result);
            observer.on_row(&row);
            rows.push(row);
        }

        let output = &settings.config.output;
        let csv_path = if output.write_csv {
            let path = settings.csv_path();
            report::write_csv(&path, &rows)?;
            Some(path)
        } else {
            None
        };
        let xlsx_path = if output.write_xlsx {
            let path = settings.xlsx_path();
            report::write_xlsx(&path, &output.sheet_name, &rows)?;
            Some(path)
        } else {
            None
        };

        Ok(RunOutput {
            rows,
            csv_path,
            xlsx_path,
        })
    }
}

/// `*.pdf` files (any extension case) directly inside `dir`, sorted by name.
pub fn list_pdfs(dir: &Path, max_files: Option<usize>) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.pdf", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut files: Vec<PathBuf> = glob_with(&pattern, options)
        .map_err(|e| FieldsError::Config(format!("invalid input directory pattern: {}", e)))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if let Some(max) = max_files {
        files.truncate(max);
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
