//! Policy Harvester main entry point
//!
//! This is the command-line interface for discovering policy documents,
//! extracting their text and analysing them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use policy_harvester::analysis::{analyze_document, ModelClient};
use policy_harvester::batch::BatchExtractor;
use policy_harvester::config::{load_config_with_hash, Config};
use policy_harvester::crawler::Coordinator;
use policy_harvester::extract::{html_to_text, Pipeline};
use policy_harvester::output::{
    load_statistics, print_analysis, print_batch_report, print_job_summary,
    print_session_report, print_statistics, write_analysis_report,
};
use policy_harvester::storage::{open_storage, Storage, UploadSource};
use policy_harvester::LinkKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Policy Harvester: discovers and extracts policy documents
///
/// Crawls paginated listing pages for PDF and HTML policy documents,
/// extracts their text in batches, and analyses individual documents with a
/// chat-completions model.
#[derive(Parser, Debug)]
#[command(name = "policy-harvester")]
#[command(version)]
#[command(about = "Policy document discovery and text extraction", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a crawl job for a seed listing page
    Submit {
        #[arg(value_name = "URL")]
        seed_url: String,
    },

    /// Run a crawl session for a job
    Crawl {
        #[arg(value_name = "JOB")]
        job_id: i64,
    },

    /// Pause a job
    Pause {
        #[arg(value_name = "JOB")]
        job_id: i64,
    },

    /// Resume a paused job
    Resume {
        #[arg(value_name = "JOB")]
        job_id: i64,
    },

    /// Show a job's status and discovery counts
    Status {
        #[arg(value_name = "JOB")]
        job_id: i64,
    },

    /// Extract text for the next batch of discovered links
    Extract {
        /// Maximum links to process (defaults to extraction.batch-size)
        #[arg(long)]
        limit: Option<usize>,

        /// Only process links discovered by this job
        #[arg(long = "job", value_name = "JOB")]
        job_id: Option<i64>,
    },

    /// Analyse a local PDF or HTML file and store the result
    Analyze {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Also write a markdown report to this path
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Show statistics from the database
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Submit { seed_url } => handle_submit(config, &seed_url),
        Command::Crawl { job_id } => handle_crawl(config, job_id).await,
        Command::Pause { job_id } => handle_pause(config, job_id),
        Command::Resume { job_id } => handle_resume(config, job_id),
        Command::Status { job_id } => handle_status(config, job_id),
        Command::Extract { limit, job_id } => handle_extract(config, limit, job_id).await,
        Command::Analyze { file, report } => handle_analyze(&config, &file, report.as_deref()).await,
        Command::Stats => handle_stats(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("policy_harvester=info,warn"),
            1 => EnvFilter::new("policy_harvester=debug,info"),
            2 => EnvFilter::new("policy_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn handle_submit(config: Config, seed_url: &str) -> Result<()> {
    let coordinator = Coordinator::new(config)?;
    let job_id = coordinator.submit_job(seed_url)?;
    println!("Created job {} for {}", job_id, seed_url);
    Ok(())
}

/// Runs one crawl session; a job that is not in progress only reports its summary
async fn handle_crawl(config: Config, job_id: i64) -> Result<()> {
    let coordinator = Coordinator::new(config)?;

    let report = match coordinator.run_job(job_id).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl of job {} failed: {}", job_id, e);
            return Err(e.into());
        }
    };

    match &report.session {
        Some(session) => print_session_report(session),
        None => println!(
            "Job {} is {}; no session was run",
            job_id, report.summary.job.status
        ),
    }
    print_job_summary(&report.summary);
    Ok(())
}

fn handle_pause(config: Config, job_id: i64) -> Result<()> {
    let coordinator = Coordinator::new(config)?;
    let status = coordinator.pause_job(job_id)?;
    println!("Job {} is {}", job_id, status);
    Ok(())
}

fn handle_resume(config: Config, job_id: i64) -> Result<()> {
    let coordinator = Coordinator::new(config)?;
    let status = coordinator.resume_job(job_id)?;
    println!("Job {} is {}", job_id, status);
    Ok(())
}

fn handle_status(config: Config, job_id: i64) -> Result<()> {
    let coordinator = Coordinator::new(config)?;
    print_job_summary(&coordinator.job_summary(job_id)?);
    Ok(())
}

/// Processes one extraction batch
async fn handle_extract(config: Config, limit: Option<usize>, job_id: Option<i64>) -> Result<()> {
    let pipeline = Pipeline::from_config(&config.extraction)
        .context("Cannot start extraction without a working OCR tier")?;
    let extraction = config.extraction.clone();
    let coordinator = Coordinator::new(config)?;

    let extractor = BatchExtractor::new(
        coordinator.storage(),
        coordinator.fetcher().clone(),
        Arc::new(pipeline),
        extraction,
    );

    let report = extractor.process_next_batch(limit, job_id).await?;
    print_batch_report(&report);
    Ok(())
}

/// Extracts raw text from a local file, analyses it and stores the analysis
async fn handle_analyze(config: &Config, file: &Path, report_path: Option<&Path>) -> Result<()> {
    let Some(summarizer) = &config.summarizer else {
        bail!("The analyze command requires a [summarizer] section in the configuration");
    };
    let client = ModelClient::from_config(summarizer)?;

    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let text = match sniff_kind(file, &bytes) {
        LinkKind::Html => html_to_text(&String::from_utf8_lossy(&bytes)),
        LinkKind::Pdf => {
            let pipeline = Pipeline::from_config(&config.extraction)?;
            tokio::task::spawn_blocking(move || pipeline.raw_text(&bytes, LinkKind::Pdf))
                .await
                .context("Text extraction task failed")?
        }
    };
    let Some(text) = text else {
        bail!("No text could be extracted from {}", file.display());
    };

    let analysis = analyze_document(
        &text,
        &client,
        Duration::from_millis(summarizer.throttle_ms),
    )
    .await?;

    let source_file = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    let id = storage.insert_analysis(&analysis, UploadSource::File, Some(&source_file), None)?;

    print_analysis(&analysis);
    println!("\nStored analysis {}", id);

    if let Some(path) = report_path {
        write_analysis_report(&analysis, &source_file, path)?;
        println!("Report written to: {}", path.display());
    }

    Ok(())
}

/// PDF by magic bytes or extension, HTML otherwise
fn sniff_kind(path: &Path, bytes: &[u8]) -> LinkKind {
    let has_pdf_extension = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if bytes.starts_with(b"%PDF") || has_pdf_extension {
        LinkKind::Pdf
    } else {
        LinkKind::Html
    }
}

/// Shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage, config.extraction.max_attempts)?;
    print_statistics(&stats);

    Ok(())
}
