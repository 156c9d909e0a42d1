mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stx")]
#[command(version, about = "Schema Transforms Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every transform of a pipeline and assemble it over its sources
    Check {
        /// Path to the pipeline file (YAML or TOML)
        pipeline: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the transform descriptions a pipeline builds
    Describe {
        /// Path to the pipeline file (YAML or TOML)
        pipeline: String,

        /// Only describe the transform with this name
        #[arg(short, long)]
        transform: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Write a starter pipeline document
    Init {
        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Pipeline name
        #[arg(short, long, default_value = "my_pipeline")]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Check { pipeline, format } => commands::check::execute(&pipeline, format),

        Commands::Describe {
            pipeline,
            transform,
            format,
        } => commands::describe::execute(&pipeline, transform.as_deref(), format),

        Commands::Init { output, name } => commands::init::execute(output.as_deref(), &name),
    }
}
