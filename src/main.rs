//! smartsort - classify files and find exact and near duplicates.
//!
//! Usage:
//!   smartsort analyze [PATH]     Analyze a directory
//!   smartsort history            List recent sessions
//!   smartsort files SESSION      Show the file records of a session
//!   smartsort groups SESSION     Show the duplicate groups of a session
//!   smartsort --help             Show help

mod logging;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};

use smartsort_core::{AnalysisSession, AnalyzeConfig, DuplicateGroup, FileRecord, SessionId};
use smartsort_engine::{AnalysisEngine, AnalysisReport};

#[derive(Parser)]
#[command(
    name = "smartsort",
    version,
    about = "Classify files and find exact and near duplicates",
    long_about = "smartsort walks a directory, classifies every file, groups exact \
                  and similar duplicates, and remembers results between runs."
)]
struct Cli {
    /// Result database (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a directory
    Analyze {
        /// Directory to analyze
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Do not read or write cached per-file results
        #[arg(long)]
        no_cache: bool,

        /// Number of worker threads (0 = automatic)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List recent analysis sessions
    History {
        /// Number of sessions to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the file records of a session
    Files {
        /// Session id
        session: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the duplicate groups of a session
    Groups {
        /// Session id
        session: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => AnalyzeConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AnalyzeConfig::load_default().context("Failed to load default config")?,
    };
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }
    tracing::debug!("Using database {}", config.resolved_database_path().display());

    match cli.command {
        Command::Analyze {
            path,
            no_cache,
            workers,
            format,
        } => {
            if let Some(workers) = workers {
                config.workers = workers;
            }
            run_analyze(config, &path, !no_cache, format)?;
        }
        Command::History { limit, format } => {
            let engine = AnalysisEngine::new(config)?;
            let sessions = engine.history(limit).context("Failed to read history")?;
            print_history(&sessions, format)?;
        }
        Command::Files { session, format } => {
            let engine = AnalysisEngine::new(config)?;
            let id = SessionId::new(session);
            let records = engine
                .session_files(&id)
                .context("Failed to read session files")?;
            print_files(&id, &records, format)?;
        }
        Command::Groups { session, format } => {
            let engine = AnalysisEngine::new(config)?;
            let id = SessionId::new(session);
            let groups = engine
                .session_groups(&id)
                .context("Failed to read session groups")?;
            print_groups(&groups, format)?;
        }
    }

    Ok(())
}

/// Run an analysis while reporting progress on stderr.
fn run_analyze(
    config: AnalyzeConfig,
    path: &Path,
    caching_enabled: bool,
    format: OutputFormat,
) -> Result<()> {
    let engine = AnalysisEngine::new(config)?;
    let validated = engine
        .validate_directory(path)
        .with_context(|| format!("Cannot analyze {}", path.display()))?;
    eprintln!(
        "Analyzing {} ({} files)...",
        validated.path.display(),
        validated.file_count
    );

    let report = std::thread::scope(|scope| {
        let handle = scope.spawn(|| engine.analyze_directory(&validated.path, caching_enabled));
        while !handle.is_finished() {
            let progress = engine.progress();
            eprint!(
                "\r {}/{} files ({:.0}%)",
                progress.files_processed,
                progress.files_total,
                progress.fraction() * 100.0
            );
            let _ = std::io::stderr().flush();
            std::thread::sleep(Duration::from_millis(100));
        }
        eprintln!();
        handle
            .join()
            .map_err(|_| eyre!("Analysis thread panicked"))
    })?
    .context("Analysis failed")?;

    match format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn print_report(report: &AnalysisReport) {
    let session = &report.session;
    let summary = &session.summary;
    let metrics = &session.performance_metrics;

    println!();
    println!("{}", "─".repeat(70));
    println!(" Session {} ({})", session.session_id, session.status);
    println!(" {}", session.directory_path.display());
    println!(
        " {} files in {:.2}s ({:.0} files/s, {} {} workers, {} chunks)",
        session.files_processed,
        session.processing_time_seconds,
        metrics.files_per_second,
        metrics.worker_count,
        metrics.processing_method,
        metrics.chunk_count
    );
    if metrics.cache_enabled {
        println!(
            " Cache: {} hits, {} misses ({:.0}% hit rate)",
            metrics.cache_hits,
            metrics.cache_misses,
            metrics.cache_hit_rate * 100.0
        );
    }
    println!("{}", "─".repeat(70));
    println!();

    println!(" Categories:");
    for (category, count) in &summary.category_counts {
        println!("   {:<14} {:>8}", category.to_string(), count);
    }
    println!();

    if report.groups.is_empty() {
        println!(" No duplicate or similar files found.");
    } else {
        println!(
            " {} exact groups, {} similar groups, {} reclaimable",
            summary.exact_groups,
            summary.similar_groups,
            format_size(summary.wasted_bytes)
        );
        println!();
        print_group_list(&report.groups);
    }

    let issues = &summary.naming_issues;
    if !issues.suggestions.is_empty() {
        println!();
        println!(" Suggested cleanup:");
        for suggestion in &issues.suggestions {
            println!("   [{:<6}] {}", suggestion.priority.to_string(), suggestion.description);
        }
    }

    if !report.warnings.is_empty() {
        println!();
        println!("{} warning(s) during discovery", report.warnings.len());
    }
}

fn print_history(sessions: &[AnalysisSession], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if sessions.is_empty() {
                println!("No sessions recorded.");
                return Ok(());
            }
            for session in sessions {
                println!(
                    "{}  {}  {:>8} files  {:>7.2}s  {:<9}  {}",
                    session.session_id,
                    session.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    session.files_processed,
                    session.processing_time_seconds,
                    session.status.to_string(),
                    session.directory_path.display()
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(sessions)?),
    }
    Ok(())
}

fn print_files(id: &SessionId, records: &[FileRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No files recorded for session {id}.");
                return Ok(());
            }
            for record in records {
                let category = record.detected_category.to_string();
                match &record.error {
                    Some(error) => println!(
                        "{:<14} {:>10}  {}  ({})",
                        category,
                        format_size(record.size_bytes),
                        record.path.display(),
                        error
                    ),
                    None => println!(
                        "{:<14} {:>10}  {}  [{:.2}]",
                        category,
                        format_size(record.size_bytes),
                        record.path.display(),
                        record.type_confidence
                    ),
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
    }
    Ok(())
}

fn print_groups(groups: &[DuplicateGroup], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if groups.is_empty() {
                println!("No groups recorded.");
            } else {
                print_group_list(groups);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(groups)?),
    }
    Ok(())
}

fn print_group_list(groups: &[DuplicateGroup]) {
    for (i, group) in groups.iter().enumerate() {
        println!(
            " Group {} [{}] ({} files, confidence {:.2}, {} wasted)",
            i + 1,
            group.kind,
            group.len(),
            group.confidence,
            format_size(group.wasted_bytes)
        );
        for member in &group.members {
            let marker = if member.path == group.keeper { "*" } else { " " };
            println!("  {} {}", marker, member.path.display());
        }
        println!("   {}", group.recommended_action);
        println!();
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
