use crate::config::AppConfig;
use anyhow::{Result, anyhow};
use backup_rotator_backends::{Backend, build_backend};
use backup_rotator_core::EngineConfig;
use backup_rotator_rotators::dmy::{DATE_KEY, MODIFIER_FORMAT};
use backup_rotator_rotators::{Rotator, build_rotator, default_registry};
use chrono::NaiveDate;
use clap::Args;
use tracing::info;

#[derive(Args)]
pub struct RotateCommand {
    #[arg(long, help = "Treat this date (YYYY-MM-DD) as today")]
    date: Option<NaiveDate>,
}

impl RotateCommand {
    pub async fn run(&self, cli: &crate::Cli) -> Result<()> {
        let (config_path, config) = AppConfig::discover(cli.config.as_deref())?;
        info!("Using configuration {}", config_path.display());

        let rotator_config = config
            .rotator
            .as_ref()
            .ok_or_else(|| anyhow!("No [rotator] section in {}", config_path.display()))?;
        let backend = build_backend(&backup_rotator_backends::default_registry(), &config.storage).await?;

        rotate_backend(rotator_config, backend.as_ref(), self.date).await
    }
}

/// Runs the configured rotator against `backend`. A date override is passed
/// to the rotator factory as the `date` key.
pub async fn rotate_backend(
    config: &EngineConfig,
    backend: &dyn Backend,
    date: Option<NaiveDate>,
) -> Result<()> {
    let config = match date {
        Some(date) => config
            .clone()
            .with(DATE_KEY, date.format(MODIFIER_FORMAT).to_string()),
        None => config.clone(),
    };
    let rotator = build_rotator(&default_registry(), &config)?;

    let summary = rotator.rotate(backend).await?;
    println!(
        "Copy {} {:?}, removed {} old cop{}",
        summary.today,
        summary.copy,
        summary.deleted.len(),
        if summary.deleted.len() == 1 { "y" } else { "ies" }
    );
    for modifier in &summary.deleted {
        info!("Removed copy {}", modifier);
    }
    Ok(())
}
