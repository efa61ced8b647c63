mod commands;
mod interrupt;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "moco", about = "Motion correction for xyt image stacks")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct motion within a single stack (affine, then bspline)
    Correct(commands::correct::CorrectArgs),
    /// Align a stack to the shared reference of its experiment
    Align(commands::align::AlignArgs),
    /// Correct a signal channel with transforms from a background channel
    TwoColor(commands::two_color::TwoColorArgs),
    /// Print or save the default configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Correct(args) => commands::correct::run(args, cli.verbose),
        Commands::Align(args) => commands::align::run(args, cli.verbose),
        Commands::TwoColor(args) => commands::two_color::run(args, cli.verbose),
        Commands::Config(args) => commands::config::run(args),
    }
}
