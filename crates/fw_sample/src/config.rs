use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use fw_core::RunConfig;

#[derive(Debug, Parser)]
#[command(name = "fw_sample", about = "framewright sample: frame loop, input edges and timing")]
pub struct Cli {
    /// JSON run configuration; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Requested context major version
    #[arg(long)]
    pub major: Option<u32>,

    /// Requested context minor version
    #[arg(long)]
    pub minor: Option<u32>,

    /// Skip presenting frames (benchmark mode)
    #[arg(long)]
    pub no_present: bool,

    /// Log profiler statistics every timing window
    #[arg(long)]
    pub print_stats: bool,

    /// Pin the process to a single core for steadier timings
    #[arg(long)]
    pub single_threaded: bool,

    /// Request a debug context regardless of build profile
    #[arg(long)]
    pub debug_context: bool,

    #[arg(long)]
    pub robust: bool,
}

impl Cli {
    pub fn resolve(&self) -> Result<RunConfig, String> {
        let mut config = match &self.config {
            Some(path) => load_config_from_path(path)?,
            None => RunConfig::default(),
        };

        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(major) = self.major {
            config.context.major = major;
        }
        if let Some(minor) = self.minor {
            config.context.minor = minor;
        }
        if self.no_present {
            config.present = false;
        }
        config.print_stats |= self.print_stats;
        config.single_threaded |= self.single_threaded;
        config.context.debug |= self.debug_context;
        config.context.robust |= self.robust;

        validate_config(&config)?;
        Ok(config)
    }
}

pub fn load_config_from_path(path: &Path) -> Result<RunConfig, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))
}

fn validate_config(config: &RunConfig) -> Result<(), String> {
    if config.width == 0 || config.height == 0 {
        return Err(format!(
            "Config validation failed: window size must be non-zero, got {}x{}",
            config.width, config.height
        ));
    }
    Ok(())
}
