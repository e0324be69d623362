//! Main entry point for the tts-restore CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use tts_restore::{Cli, GameData, logger, restore};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logger::init(cli.log_level()) {
        eprintln!("Failed to initialize logging: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let gamedata_dir = match &cli.gamedata {
        Some(dir) => dir.clone(),
        None => GameData::default_dir()
            .context("Could not determine the game data directory, pass --gamedata")?,
    };

    let gamedata = GameData::locate(gamedata_dir)?;
    let report = restore(&gamedata, &cli.restore_options()).await?;

    tracing::debug!(
        info_member = %report.info_member,
        files = report.extracted.len(),
        catalog = ?report.catalog,
        "Restore finished"
    );

    Ok(())
}
