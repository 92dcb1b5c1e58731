mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{backup::BackupCommand, engines::EnginesCommand, rotate::RotateCommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(
    name = "backup-rotator",
    about = "Stream a backup to storage and rotate dated copies",
    long_about = "Backup Rotator writes a single data stream to a local file or S3 object and keeps a day/month/year set of dated copies next to it"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, env = "BACKUP_ROTATOR_CONFIG", help = "Configuration file")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,

    #[arg(short, long, help = "Enable quiet mode")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Write a backup from a file or stdin, then rotate copies")]
    Backup(BackupCommand),

    #[command(about = "Rotate dated copies of the existing backup")]
    Rotate(RotateCommand),

    #[command(about = "List available storage and rotator engines")]
    Engines(EnginesCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    info!("Starting backup-rotator");

    match cli.command {
        Commands::Backup(ref cmd) => cmd.run(&cli).await,
        Commands::Rotate(ref cmd) => cmd.run(&cli).await,
        Commands::Engines(ref cmd) => cmd.run(),
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "backup_rotator={level},backup_rotator_core={level},backup_rotator_backends={level},backup_rotator_rotators={level}"
        ))
    });
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Setting default subscriber failed");
}
