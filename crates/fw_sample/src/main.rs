//! framewright sample -- entry point.
//!
//! Parses the CLI and optional JSON config, opens a winit window with a wgpu
//! context, and hands both to `AppRunner`, which owns the frame loop until Escape
//! or a window close. Setup failures are logged and turned into a failing exit
//! code.

mod config;
mod sample;

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use fw_core::{AppRunner, SystemClock};
use fw_platform::WinitPlatform;

use config::Cli;
use sample::SampleApp;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    log::info!("framewright sample starting...");

    let mut platform = match WinitPlatform::new() {
        Ok(platform) => platform,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let mut app = SampleApp::new(platform.gpu());
    let clock = SystemClock::new();

    match AppRunner::new(config).run(&mut platform, &mut app, &clock) {
        Ok(summary) => {
            log::info!("Exited ({:?}) after {} frames", summary.exit, summary.frames);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            let mut source = err.source();
            while let Some(cause) = source {
                log::error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
