mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "grader-cli")]
#[command(about = "Grader CLI - Grade source files on the remote execution host", long_about = None)]
struct Cli {
    /// JSON config file (defaults to environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file remotely and grade it
    Run {
        /// Source file to submit
        #[arg(short, long)]
        source: PathBuf,

        /// Argument string for one visible test (repeatable)
        #[arg(short, long = "test")]
        tests: Vec<String>,

        /// Expected stdout for the visible test at the same position (repeatable)
        #[arg(short, long = "expect")]
        expects: Vec<String>,

        /// Argument string for one hidden test (repeatable)
        #[arg(long = "hidden-test")]
        hidden_tests: Vec<String>,

        /// Expected stdout for the hidden test at the same position (repeatable)
        #[arg(long = "hidden-expect")]
        hidden_expects: Vec<String>,
    },

    /// Connect to the execution host and run `uname -a`
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            source,
            tests,
            expects,
            hidden_tests,
            hidden_expects,
        } => {
            let submission =
                commands::build_submission(&source, tests, expects, hidden_tests, hidden_expects)
                    .await?;
            let passed = commands::run_submission(&config, submission).await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Ping => {
            commands::ping(&config).await?;
        }
    }

    Ok(())
}
