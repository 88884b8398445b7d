use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use math_mandala::services::MarkerMode;
use math_mandala::utils::logging;
use math_mandala::{App, Config, Subject};

#[derive(Debug, Parser)]
#[command(name = "math-mandala")]
#[command(about = "Photograph homework, get per-question feedback")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(long, global = true, env = "MATH_MANDALA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a task, wait for the photo and grade it
    Run {
        /// math, story-mountain or biology
        #[arg(short, long, default_value = "math")]
        subject: Subject,

        /// Read captures from a local directory instead of the upload server
        #[arg(long)]
        local_dir: Option<PathBuf>,

        /// How many times to wait for a photo before giving up
        #[arg(long, default_value_t = 1)]
        waits: usize,
    },

    /// List saved sessions, newest first
    History,

    /// Show a saved session
    Review {
        /// Session name, e.g. 2026-10-18_09-30-00
        name: String,
    },

    /// Split recognized text into per-question answers (prints JSON)
    Segment {
        /// Text file with the recognized answers
        file: PathBuf,

        /// Also accept `1.` markers and keep text on the marker line
        #[arg(long)]
        prefix_capture: bool,
    },

    /// Match a model reply against a question file
    Reconcile {
        /// TOML file with a [questions] table
        #[arg(long)]
        questions: PathBuf,

        /// File with the raw model reply
        #[arg(long)]
        reply: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?.with_env_overrides(),
        None => Config::load()?,
    };
    if let Commands::Run {
        local_dir: Some(dir),
        ..
    } = &cli.command
    {
        config.local_capture_dir = Some(dir.display().to_string());
    }

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    let app = App::initialize(config)?;

    match cli.command {
        Commands::Run { subject, waits, .. } => {
            app.run_session(subject, waits).await?;
        }
        Commands::History => {
            app.history().await?;
        }
        Commands::Review { name } => app.review(&name).await?,
        Commands::Segment {
            file,
            prefix_capture,
        } => {
            let mode = if prefix_capture {
                MarkerMode::PrefixCapture
            } else {
                MarkerMode::Strict
            };
            app.segment_file(&file, mode).await?;
        }
        Commands::Reconcile { questions, reply } => {
            app.reconcile_files(&questions, &reply).await?;
        }
    }

    Ok(())
}
