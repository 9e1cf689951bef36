//! Drowsy Detect CLI - run the continuous eye-closure detector over recorded frames.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod run;
mod sample;

#[derive(Parser)]
#[command(name = "drowsy-detect", version, about = "Continuous eye-closure detection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the detector over a JSON file of frame records
    Run(run::RunArgs),
    /// Write a sample configuration file with the default settings
    SampleConfig(sample::SampleConfigArgs),
    /// Generate a synthetic frame-record file with periodic closed-eye bursts
    SampleInput(sample::SampleInputArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run(args) => run::run(&args),
        Commands::SampleConfig(args) => sample::write_sample_config(&args),
        Commands::SampleInput(args) => sample::write_sample_input(&args),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}
