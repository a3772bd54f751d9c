//! Extract command - process a folder of PDFs.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use pdffields_core::{
    FolderPipeline, ProviderKind, ReportRow, RunObserver, Settings, VisionClient, default_backend,
};

use super::config::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Folder with the PDFs to process
    #[arg(long)]
    input_dir: PathBuf,

    /// Folder for the CSV/XLSX reports (created if missing)
    #[arg(long)]
    out_dir: PathBuf,

    /// Process at most this many files
    #[arg(long)]
    max_files: Option<usize>,

    /// Vision model (or Azure deployment) name
    #[arg(long)]
    model: Option<String>,

    /// Vision API provider
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Do not write the CSV report
    #[arg(long)]
    no_csv: bool,

    /// Do not write the XLSX report
    #[arg(long)]
    no_xlsx: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ProviderArg {
    /// OpenAI API (OPENAI_API_KEY)
    Openai,
    /// Azure OpenAI (AZURE_OPENAI_API_KEY, AZURE_OPENAI_ENDPOINT)
    Azure,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openai => ProviderKind::OpenAi,
            ProviderArg::Azure => ProviderKind::Azure,
        }
    }
}

/// Progress bar driven by the pipeline.
#[derive(Default)]
struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message("Complete");
        }
    }
}

impl RunObserver for Progress {
    fn on_start(&mut self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        self.bar = Some(bar);
    }

    fn on_row(&mut self, row: &ReportRow) {
        if let Some(bar) = &self.bar {
            bar.set_message(row.file_name.clone());
            bar.inc(1);
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    // File < environment < flags
    let mut config = load_config(config_path)?;
    if let Some(model) = args.model {
        config.vision.model = model;
    }
    if let Some(provider) = args.provider {
        config.vision.provider = provider.into();
    }
    if args.no_csv {
        config.output.write_csv = false;
    }
    if args.no_xlsx {
        config.output.write_xlsx = false;
    }

    let settings = Settings::new(args.input_dir, args.out_dir, config).with_max_files(args.max_files);
    debug!("Effective settings: {:?}", settings);

    let backend = default_backend();
    let mut progress = Progress::default();

    let output = FolderPipeline::new(&settings, backend.as_ref())
        .run(|s| Ok(VisionClient::from_config(&s.config)?), &mut progress)
        .await?;
    progress.finish();

    if output.rows.is_empty() {
        println!(
            "{} No PDFs found in {}",
            style("ℹ").blue(),
            settings.input_dir.display()
        );
        return Ok(());
    }

    let with_date = output.rows.iter().filter(|r| !r.date.is_empty()).count();
    let with_cuit = output.rows.iter().filter(|r| !r.cuit.is_empty()).count();

    println!(
        "{} Processed {} files in {:?} ({} with date, {} with CUIT)",
        style("✓").green(),
        output.rows.len(),
        start.elapsed(),
        style(with_date).green(),
        style(with_cuit).green()
    );

    for path in [&output.csv_path, &output.xlsx_path].into_iter().flatten() {
        println!("   {}", path.display());
    }

    Ok(())
}
