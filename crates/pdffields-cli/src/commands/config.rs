//! Config command - manage configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};
use console::style;

use pdffields_core::FieldsConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration (file and environment)
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "throttle.max_retries")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(config_path),
        ConfigCommand::Init(init_args) => init_config(init_args),
        ConfigCommand::Get { key } => get_config(config_path, &key),
        ConfigCommand::Set { key, value } => set_config(config_path, &key, &value),
        ConfigCommand::Path => show_path(),
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pdffields")
        .join("config.json")
}

/// Config file (explicit, else default location if present) with env overrides.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FieldsConfig> {
    let mut config = read_file_config(config_path)?;
    config.apply_env()?;
    Ok(config)
}

fn read_file_config(config_path: Option<&str>) -> anyhow::Result<FieldsConfig> {
    match config_path {
        Some(path) => FieldsConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to read config file {}", path)),
        None => {
            let path = default_config_path();
            if path.exists() {
                FieldsConfig::from_file(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))
            } else {
                Ok(FieldsConfig::default())
            }
        }
    }
}

fn file_path(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

fn show_config(config_path: Option<&str>) -> anyhow::Result<()> {
    if !file_path(config_path).exists() {
        eprintln!(
            "{} No config file found, showing defaults and environment.",
            style("ℹ").blue()
        );
    }

    let config = load_config(config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(default_config_path);

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    FieldsConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn get_config(config_path: Option<&str>, key: &str) -> anyhow::Result<()> {
    let config = read_file_config(config_path)?;
    let json = serde_json::to_value(&config)?;

    let mut current = &json;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    }

    println!("{}", serde_json::to_string_pretty(current)?);

    Ok(())
}

fn set_config(config_path: Option<&str>, key: &str, value: &str) -> anyhow::Result<()> {
    let path = file_path(config_path);
    let config = if path.exists() {
        FieldsConfig::from_file(&path)?
    } else {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        FieldsConfig::default()
    };

    let parsed_value: serde_json::Value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    let mut json = serde_json::to_value(&config)?;
    let parts: Vec<&str> = key.split('.').collect();
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| anyhow::anyhow!("Empty configuration key"))?;

    let mut current = &mut json;
    for part in parents {
        current = current
            .get_mut(*part)
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
    }

    let object = current
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Cannot set value at non-object path"))?;
    if !object.contains_key(*last) {
        anyhow::bail!("Configuration key not found: {}", key);
    }
    object.insert((*last).to_string(), parsed_value.clone());

    let config: FieldsConfig = serde_json::from_value(json)
        .with_context(|| format!("Invalid value for {}", key))?;
    config.save(&path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );

    Ok(())
}

fn show_path() -> anyhow::Result<()> {
    let config_path = default_config_path();

    println!("Configuration file: {}", config_path.display());

    if config_path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'pdffields config init' to create a configuration file.");
    }

    Ok(())
}
