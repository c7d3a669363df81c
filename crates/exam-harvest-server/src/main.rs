//! exam-harvest command-line entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tokio_util::sync::CancellationToken;

use exam_harvest::{
    export, input, select_range, BatchEvent, BatchRunner, Checkpointer, ExtractionProfile,
    JobManager, PageScraper, QuestionRecord, ScraperConfig, SummaryReport,
};
use exam_harvest_server::AppState;

#[derive(Parser)]
#[command(
    name = "exam-harvest",
    about = "Scrape exam-question discussion pages into structured records",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// JSON config file; HARVEST_* environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base delay between requests, in milliseconds.
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// Total fetch attempts per page.
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server (default).
    Serve {
        /// Listen address (host:port).
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: String,
    },

    /// Scrape a target list in the foreground and write the results.
    Run {
        /// Targets as a JSON array or a Topic,Question,Link sheet (.csv).
        #[arg(long)]
        targets: PathBuf,

        /// Where to save the records (JSON).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also save the records as CSV with pipe-joined list fields.
        #[arg(long)]
        flat_output: Option<PathBuf>,

        /// First target index to scrape.
        #[arg(long)]
        start: Option<usize>,

        /// Index one past the last target to scrape.
        #[arg(long)]
        end: Option<usize>,

        /// Write a summary report next to the output.
        #[arg(long)]
        summary: bool,

        /// Extraction profile (advanced, basic).
        #[arg(long)]
        profile: Option<ExtractionProfile>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   exam-harvest completions bash > ~/.local/share/bash-completion/completions/exam-harvest
    ///   exam-harvest completions zsh > ~/.zfunc/_exam-harvest
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let mut config = ScraperConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(delay_ms) = cli.delay_ms {
        config.delay_ms = delay_ms;
    }
    if let Some(max_retries) = cli.max_retries {
        config.max_retries = max_retries;
    }

    match cli.command.unwrap_or(Commands::Serve {
        addr: "127.0.0.1:5000".to_string(),
    }) {
        Commands::Serve { addr } => {
            tracing::info!(
                profile = %config.profile,
                delay_ms = config.delay_ms,
                max_retries = config.max_retries,
                "exam-harvest server"
            );
            let manager = JobManager::new(config).context("creating job manager")?;
            exam_harvest_server::start(&addr, AppState::new(manager)).await?;
        }

        Commands::Run {
            targets,
            output,
            flat_output,
            start,
            end,
            summary,
            profile,
        } => {
            if let Some(profile) = profile {
                config.profile = profile;
            }
            let opts = RunOptions {
                targets,
                output,
                flat_output,
                start,
                end,
                summary,
            };
            run_batch(config, opts).await?;
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "exam-harvest", &mut std::io::stdout());
        }
    }

    Ok(())
}

struct RunOptions {
    targets: PathBuf,
    output: Option<PathBuf>,
    flat_output: Option<PathBuf>,
    start: Option<usize>,
    end: Option<usize>,
    summary: bool,
}

async fn run_batch(config: ScraperConfig, opts: RunOptions) -> anyhow::Result<()> {
    let all = input::load_targets(&opts.targets)
        .with_context(|| format!("loading targets from {}", opts.targets.display()))?;
    let targets = select_range(&all, opts.start, opts.end);
    anyhow::ensure!(!targets.is_empty(), "no targets in the selected range");

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let output = opts
        .output
        .unwrap_or_else(|| PathBuf::from(format!("scraped_questions_{stamp}.json")));
    let run_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("run_{stamp}"));

    let checkpointer = Checkpointer::create(&config.resolved_checkpoint_dir(), &run_name).await?;
    tracing::info!(
        targets = targets.len(),
        total = all.len(),
        profile = %config.profile,
        checkpoint = %checkpointer.path().display(),
        "starting run"
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current page");
            on_ctrl_c.cancel();
        }
    });

    let scraper = PageScraper::from_config(&config)?;
    let runner = BatchRunner::new(Arc::new(scraper))
        .with_checkpoints(Arc::new(checkpointer), config.checkpoint_interval())
        .with_cancellation(cancel);

    let total = targets.len();
    let outcome = runner
        .run(targets, |event| match event {
            BatchEvent::Scraped {
                index,
                question,
                progress,
            } => {
                tracing::info!(question = %question, "progress {}/{total} ({progress}%)", index + 1);
            }
            BatchEvent::Skipped {
                question, error, ..
            } => {
                tracing::warn!(question = %question, error = %error, "skipped");
            }
            BatchEvent::CheckpointScheduled { records, path } => {
                tracing::debug!(records, path = %path, "checkpoint scheduled");
            }
        })
        .await;

    save_json(&output, &outcome.records)?;
    tracing::info!(
        records = outcome.records.len(),
        skipped = outcome.skipped.len(),
        cancelled = outcome.cancelled,
        "saved {}",
        output.display()
    );

    if let Some(flat_path) = opts.flat_output {
        let file = std::fs::File::create(&flat_path)
            .with_context(|| format!("creating {}", flat_path.display()))?;
        export::write_csv(&outcome.records, std::io::BufWriter::new(file))?;
        tracing::info!("exported CSV to {}", flat_path.display());
    }

    if opts.summary {
        write_summary(&output, &stamp, &outcome.records)?;
    }

    Ok(())
}

fn write_summary(output: &Path, stamp: &str, records: &[QuestionRecord]) -> anyhow::Result<()> {
    let Some(report) = SummaryReport::from_records(records) else {
        tracing::warn!("no records, skipping summary report");
        return Ok(());
    };
    let path = output
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(format!("summary_report_{stamp}.json"));
    save_json(&path, &report)?;
    tracing::info!(summary = %serde_json::to_string(&report)?, "saved {}", path.display());
    Ok(())
}

fn save_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
