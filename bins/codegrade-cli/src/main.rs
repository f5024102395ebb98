mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "codegrade")]
#[command(about = "Compile, run and grade student submissions against test cases", long_about = None)]
struct Cli {
    /// Engine config file (JSON). Falls back to CODEGRADE_CONFIG, then built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value = "false")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source file once with the grading time limit
    Run {
        /// Source file to execute
        source: PathBuf,

        /// Language (java, python3, cpp, c); inferred from the file extension if omitted
        #[arg(short, long)]
        language: Option<String>,

        /// Text fed to stdin
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        /// File whose contents are fed to stdin
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Time limit in milliseconds
        #[arg(short, long)]
        time_limit: Option<u64>,
    },

    /// Run a source file with custom input and the longer custom-input time limit
    Custom {
        source: PathBuf,

        #[arg(short, long)]
        language: Option<String>,

        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        #[arg(long)]
        input_file: Option<PathBuf>,

        #[arg(short, long)]
        time_limit: Option<u64>,
    },

    /// Grade a source file against a JSON array of test cases
    Evaluate {
        source: PathBuf,

        /// JSON file: [{"input": "...", "expectedOutput": "..."}, ...]
        #[arg(short, long)]
        cases: PathBuf,

        #[arg(short, long)]
        language: Option<String>,

        #[arg(short, long)]
        time_limit: Option<u64>,

        /// Stop after the first compilation, policy or missing-toolchain error (sample-case dry run)
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Report which toolchains are installed
    Probe {
        /// Only probe this language
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Remove leftover run directories from the work dir
    Clean {
        /// Only remove directories older than this many seconds
        #[arg(long, default_value = "3600")]
        older_than_secs: u64,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout carries the JSON result, so logs go to stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let executor = commands::build_executor(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            source,
            language,
            input,
            input_file,
            time_limit,
        } => {
            let stdin = commands::read_input(input, input_file.as_deref())?;
            commands::run(&executor, &source, language.as_deref(), &stdin, time_limit, false).await?;
        }
        Commands::Custom {
            source,
            language,
            input,
            input_file,
            time_limit,
        } => {
            let stdin = commands::read_input(input, input_file.as_deref())?;
            commands::run(&executor, &source, language.as_deref(), &stdin, time_limit, true).await?;
        }
        Commands::Evaluate {
            source,
            cases,
            language,
            time_limit,
            dry_run,
        } => {
            commands::evaluate(&executor, &source, &cases, language.as_deref(), time_limit, dry_run)
                .await?;
        }
        Commands::Probe { language } => {
            commands::probe(&executor, language.as_deref()).await?;
        }
        Commands::Clean { older_than_secs } => {
            commands::clean(&executor, older_than_secs).await?;
        }
    }

    Ok(())
}
