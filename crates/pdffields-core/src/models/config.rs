//! Configuration structures for the extraction pipeline.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! environment variables, then whatever the CLI sets explicitly. The result is
//! a single [`Settings`] value handed down to every component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::FieldsError;

/// Tunable configuration (everything except the per-run directories).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    /// Vision model configuration.
    pub vision: VisionConfig,

    /// Call throttling and retry configuration.
    pub throttle: ThrottleConfig,

    /// Page rendering configuration.
    pub render: RenderConfig,

    /// Date plausibility bounds.
    pub dates: DateConfig,

    /// Report output configuration.
    pub output: OutputConfig,
}

/// Which endpoint family the vision client talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// api.openai.com (or a compatible base URL).
    #[default]
    OpenAi,
    /// Azure OpenAI deployment.
    Azure,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = FieldsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "azure" => Ok(ProviderKind::Azure),
            other => Err(FieldsError::Config(format!(
                "unknown provider '{}', expected 'openai' or 'azure'",
                other
            ))),
        }
    }
}

/// Vision model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Model name (deployment name for Azure).
    pub model: String,

    /// Endpoint family.
    pub provider: ProviderKind,

    /// Azure REST API version.
    pub azure_api_version: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            provider: ProviderKind::OpenAi,
            azure_api_version: "2024-06-01".to_string(),
        }
    }
}

/// Throttling and backoff for vision calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum spacing between two calls, in seconds.
    pub min_call_interval_s: f64,

    /// Attempts per call before giving up.
    pub max_retries: u32,

    /// First backoff delay, in seconds.
    pub initial_backoff_s: f64,

    /// Backoff ceiling, in seconds.
    pub max_backoff_s: f64,

    /// Upper bound of the random jitter added to each wait, in seconds.
    pub max_jitter_s: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_call_interval_s: 0.35,
            max_retries: 6,
            initial_backoff_s: 0.6,
            max_backoff_s: 5.0,
            max_jitter_s: 0.25,
        }
    }
}

impl ThrottleConfig {
    pub fn min_call_interval(&self) -> Duration {
        secs(self.min_call_interval_s)
    }

    pub fn initial_backoff(&self) -> Duration {
        secs(self.initial_backoff_s)
    }

    pub fn max_backoff(&self) -> Duration {
        secs(self.max_backoff_s)
    }

    pub fn max_jitter(&self) -> Duration {
        secs(self.max_jitter_s)
    }

    /// Reject delays that are negative, not finite or too large for a `Duration`.
    pub fn validate(&self) -> Result<(), FieldsError> {
        check_secs("throttle.min_call_interval_s", self.min_call_interval_s)?;
        check_secs("throttle.initial_backoff_s", self.initial_backoff_s)?;
        check_secs("throttle.max_backoff_s", self.max_backoff_s)?;
        check_secs("throttle.max_jitter_s", self.max_jitter_s)?;
        Ok(())
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

fn check_secs(key: &str, value: f64) -> Result<f64, FieldsError> {
    if value < 0.0 || Duration::try_from_secs_f64(value).is_err() {
        return Err(FieldsError::Config(format!(
            "invalid value for {}: '{}' (expected a non-negative number of seconds)",
            key, value
        )));
    }
    Ok(value)
}

/// Page rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Zoom factor for anchored crops.
    pub zoom_clip: f32,

    /// Zoom factor for full-page fallback renders.
    pub zoom_full: f32,

    /// Anchors tried per field on one page.
    pub max_rects_per_anchor: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            zoom_clip: 5.0,
            zoom_full: 2.5,
            max_rects_per_anchor: 2,
        }
    }
}

/// Accepted year range for normalized dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            min_year: 1990,
            max_year: 2100,
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// CSV file name inside the output directory.
    pub csv_name: String,

    /// XLSX file name inside the output directory.
    pub xlsx_name: String,

    /// Worksheet name in the XLSX report.
    pub sheet_name: String,

    /// Write the CSV report.
    pub write_csv: bool,

    /// Write the XLSX report.
    pub write_xlsx: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_name: "lote_resultados.csv".to_string(),
            xlsx_name: "lote_resultados.xlsx".to_string(),
            sheet_name: "Resumen Lote".to_string(),
            write_csv: true,
            write_xlsx: true,
        }
    }
}

impl FieldsConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        config
            .throttle
            .validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), FieldsError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), FieldsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("MODEL_VISION") {
            self.vision.model = model;
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.vision.provider = provider.parse()?;
        }

        set_secs(&lookup, "MIN_CALL_INTERVAL_S", &mut self.throttle.min_call_interval_s)?;
        set_parsed(&lookup, "MAX_RETRIES", &mut self.throttle.max_retries)?;
        set_secs(&lookup, "INITIAL_BACKOFF_S", &mut self.throttle.initial_backoff_s)?;
        set_secs(&lookup, "MAX_BACKOFF_S", &mut self.throttle.max_backoff_s)?;

        set_parsed(&lookup, "RENDER_ZOOM_CLIP", &mut self.render.zoom_clip)?;
        set_parsed(&lookup, "RENDER_ZOOM_FULL", &mut self.render.zoom_full)?;
        set_parsed(&lookup, "MAX_RECTS_PER_ANCHOR", &mut self.render.max_rects_per_anchor)?;

        set_parsed(&lookup, "MIN_YEAR", &mut self.dates.min_year)?;
        set_parsed(&lookup, "MAX_YEAR", &mut self.dates.max_year)?;

        // Anything but "0" enables the output.
        if let Some(value) = lookup("WRITE_CSV") {
            self.output.write_csv = value.trim() != "0";
        }
        if let Some(value) = lookup("WRITE_XLSX") {
            self.output.write_xlsx = value.trim() != "0";
        }

        Ok(())
    }
}

fn set_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), FieldsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw.trim().parse().map_err(|_| {
            FieldsError::Config(format!("invalid value for {}: '{}'", key, raw))
        })?;
    }
    Ok(())
}

fn set_secs<F>(lookup: &F, key: &str, target: &mut f64) -> Result<(), FieldsError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut value = *target;
    set_parsed(lookup, key, &mut value)?;
    *target = check_secs(key, value)?;
    Ok(())
}

/// Complete, read-only configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Folder scanned for PDFs.
    pub input_dir: PathBuf,

    /// Folder receiving the reports.
    pub out_dir: PathBuf,

    /// Process at most this many files.
    pub max_files: Option<usize>,

    /// Tunables.
    pub config: FieldsConfig,
}

impl Settings {
    pub fn new(input_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, config: FieldsConfig) -> Self {
        Self {
            input_dir: input_dir.into(),
            out_dir: out_dir.into(),
            max_files: None,
            config,
        }
    }

    pub fn with_max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn csv_path(&self) -> PathBuf {
        self.out_dir.join(&self.config.output.csv_name)
    }

    pub fn xlsx_path(&self) -> PathBuf {
        self.out_dir.join(&self.config.output.xlsx_name)
    }
}
