// taskmind - notices the order you do things in
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use taskmind_lib::{
    core::ProjectDetector,
    db::{Session, Task},
    intelligence::{Analyzer, InMemoryPersonalizationStore, PatternDetector},
    Config, Database,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Flags every command understands
#[derive(Debug, Default)]
struct Options {
    repository: Option<String>,
    config: Option<PathBuf>,
    rest: Vec<String>,
}

/// Shape of an import file; both lists are optional
#[derive(Debug, Deserialize)]
struct ImportFile {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    sessions: Vec<Session>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = &args[1];
    let options = parse_options(&args[2..])?;

    match command.as_str() {
        "import" => handle_import(&options).await,
        "refresh" => handle_refresh(&options).await,
        "patterns" => handle_patterns(&options).await,
        "analyze" => handle_analyze(&options).await,
        "status" => handle_status().await,
        "version" | "-v" | "--version" => {
            println!("taskmind v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            Ok(())
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,taskmind=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_options(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--repo" => match iter.next() {
                Some(value) => options.repository = Some(value.clone()),
                None => bail!("--repo needs a value"),
            },
            "--config" => match iter.next() {
                Some(value) => options.config = Some(PathBuf::from(value)),
                None => bail!("--config needs a value"),
            },
            other => options.rest.push(other.to_string()),
        }
    }

    Ok(options)
}

async fn handle_import(options: &Options) -> anyhow::Result<()> {
    let Some(path) = options.rest.first() else {
        bail!("Usage: taskmind import <file.json>");
    };

    let raw = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path))?;
    let file: ImportFile = serde_json::from_str(&raw).with_context(|| format!("invalid import file {}", path))?;

    let db = get_database().await?;
    for task in &file.tasks {
        db.insert_task(task).await?;
    }
    for session in &file.sessions {
        db.insert_session(session).await?;
    }

    println!(
        "Imported {} task(s) and {} session(s) from {}",
        file.tasks.len(),
        file.sessions.len(),
        path
    );
    Ok(())
}

async fn handle_refresh(options: &Options) -> anyhow::Result<()> {
    let config = Config::load(options.config.as_deref())?;
    let repository = resolve_repository(options)?;
    let db = Arc::new(get_database().await?);

    let detector = PatternDetector::with_database(db, config.detector);
    let report = detector.refresh_patterns(&repository).await?;

    println!(
        "Refreshed patterns for {}: {} created, {} updated, {} failed",
        repository, report.created, report.updated, report.failed
    );
    Ok(())
}

async fn handle_patterns(options: &Options) -> anyhow::Result<()> {
    let config = Config::load(options.config.as_deref())?;
    let repository = resolve_repository(options)?;
    let db = Arc::new(get_database().await?);

    let detector = PatternDetector::with_database(db, config.detector);
    let patterns = detector.get_active_patterns(&repository).await?;

    if patterns.is_empty() {
        println!("No active patterns for {}. Try 'taskmind refresh' first.", repository);
        return Ok(());
    }

    println!("\nActive patterns for {}:", repository);
    println!("{}", "=".repeat(60));
    for (i, pattern) in patterns.iter().enumerate() {
        println!(
            "{:3}. [{}] {} (confidence: {:.0}%, seen {} times)",
            i + 1,
            pattern.pattern_type,
            pattern.name,
            pattern.confidence * 100.0,
            pattern.occurrences
        );
        if !pattern.description.is_empty() {
            println!("     {}", pattern.description);
        }
    }
    println!("{}", "=".repeat(60));
    Ok(())
}

async fn handle_analyze(options: &Options) -> anyhow::Result<()> {
    let config = Config::load(options.config.as_deref())?;
    let repository = resolve_repository(options)?;
    let db = Arc::new(get_database().await?);

    let analyzer = Analyzer::new(db, &config, Arc::new(InMemoryPersonalizationStore::new()));

    println!("\nAnalyzing {}...\n", repository);
    let report = analyzer.analyze(&repository).await?;

    println!("{}", "=".repeat(60));
    println!("Analysis Report");
    println!("{}", "=".repeat(60));
    println!(
        "\nPatterns: {} active ({} created, {} updated this run)",
        report.patterns_found, report.refresh.created, report.refresh.updated
    );

    if !report.bottlenecks.is_empty() {
        println!("\nBottlenecks:");
        for bottleneck in report.bottlenecks.iter().take(5) {
            println!(
                "  - [{:?}] {} (~{:.1}h lost)",
                bottleneck.severity, bottleneck.description, bottleneck.impact
            );
        }
    }

    if !report.suggestions.is_empty() {
        println!("\nSuggestions:");
        for suggestion in &report.suggestions {
            let score = suggestion.score().unwrap_or(0.0);
            println!("\n  {}. {} (score: {:.0}%)", position_of(suggestion), suggestion.content, score * 100.0);
            if !suggestion.reasoning.is_empty() {
                println!("     {}", suggestion.reasoning);
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    Ok(())
}

async fn handle_status() -> anyhow::Result<()> {
    let db = get_database().await?;
    let stats = db.stats().await?;

    println!("\ntaskmind Status");
    println!("{}", "=".repeat(60));
    println!("  Database:  {}", db.path().display());
    println!("  Tasks:     {}", stats.total_tasks);
    println!("  Sessions:  {}", stats.total_sessions);
    println!("  Patterns:  {}", stats.total_patterns);
    match Config::default_path() {
        Some(path) if path.exists() => println!("  Config:    {}", path.display()),
        _ => println!("  Config:    defaults"),
    }
    println!("{}", "=".repeat(60));
    Ok(())
}

fn position_of(suggestion: &taskmind_lib::intelligence::TaskSuggestion) -> usize {
    suggestion.ranking.as_ref().map(|r| r.position).unwrap_or(0)
}

fn resolve_repository(options: &Options) -> anyhow::Result<String> {
    if let Some(repository) = &options.repository {
        return Ok(repository.clone());
    }
    let cwd = env::current_dir()?;
    Ok(ProjectDetector::repository_id(&cwd)?)
}

async fn get_database() -> anyhow::Result<Database> {
    let home = dirs::home_dir().context("could not find home directory")?;
    let db_path = home.join(".taskmind").join("taskmind.db");
    Ok(Database::new(db_path).await?)
}

fn print_usage() {
    println!(
        r#"taskmind v{} - notices the order you do things in

USAGE:
    taskmind <COMMAND> [OPTIONS]

COMMANDS:
    import <file.json>     Import tasks and sessions
    refresh                Re-mine the last 30 days of history
    patterns               Show active patterns
    analyze                Refresh, find bottlenecks and rank suggestions
    status                 Show database stats
    version                Show version
    help                   Show this help

OPTIONS:
    --repo <owner/name>    Repository to work on (default: detected from git)
    --config <path>        Config file (default: $TASKMIND_CONFIG or ~/.taskmind/config.json)

LOGGING:
    Set RUST_LOG to change verbosity, e.g. RUST_LOG=taskmind=debug
"#,
        env!("CARGO_PKG_VERSION")
    );
}
