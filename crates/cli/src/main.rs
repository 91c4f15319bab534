use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ComputeArgs, QaArgs, SignalsArgs, ValidateArgs};

#[derive(Parser)]
#[command(name = "cotdash")]
#[command(about = "Weekly COT positioning metrics pipeline", long_about = None)]
struct Cli {
    /// Project root; relative paths in the config resolve against it
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file path (relative to the root)
    #[arg(short, long, global = true, default_value = "config/Config.toml")]
    config: PathBuf,

    /// Profile overlay, read from Config.{profile}.toml next to the config file
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, validate and publish the weekly metrics table
    Compute(ComputeArgs),
    /// Re-run the validation checks on an existing metrics file
    Validate(ValidateArgs),
    /// Derive ACTIVE/PAUSE signal status from a metrics file
    Signals(SignalsArgs),
    /// Run the canonical input quality gate
    Qa(QaArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.root.as_deref(), &cli.config, cli.profile.as_deref())?;

    match cli.command {
        Commands::Compute(args) => commands::run_compute(args, &config),
        Commands::Validate(args) => commands::run_validate(args, &config),
        Commands::Signals(args) => commands::run_signals(args, &config),
        Commands::Qa(args) => commands::run_qa(args, &config),
    }
}
