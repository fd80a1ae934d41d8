//! lim-patterns CLI entry point

use clap::Parser;
use colored::Colorize;
use lim_patterns::config::{CliOptions, Config, OutputFormat};
use lim_patterns::output::formatter_for;
use lim_patterns::{Engine, MemoryGraph, PatternLoader};
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "lim-patterns")]
#[command(author, version, about = "Find patterns and anti-patterns in a LIM code graph", long_about = None)]
struct Cli {
    /// Pattern files, folders or glob patterns
    patterns: Vec<String>,

    /// Code graph to analyze (.json, .yaml)
    #[arg(short, long, required_unless_present = "check")]
    graph: Option<PathBuf>,

    /// Folder holding predefined patterns referenced by name
    #[arg(long, value_name = "DIR")]
    patterns_folder: Option<PathBuf>,

    /// Only run patterns whose name matches (comma-separated globs)
    #[arg(long, value_delimiter = ',')]
    whitelist: Vec<String>,

    /// Skip patterns whose name matches (comma-separated globs)
    #[arg(long, value_delimiter = ',')]
    blacklist: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Config file path (default: auto-detect .lim-patterns.yaml)
    #[arg(short, long, env = "LIM_PATTERNS_CONFIG")]
    config: Option<PathBuf>,

    /// Known metric names, used to validate references (comma-separated)
    #[arg(long, value_delimiter = ',')]
    metrics: Vec<String>,

    /// Only compile the patterns and report errors
    #[arg(long)]
    check: bool,

    /// Number of parallel jobs for loading (0 = auto)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    // Load or create configuration
    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(config_path).into_diagnostic()?
    } else {
        let start_dir = std::env::current_dir().into_diagnostic()?;
        match Config::find_and_load(&start_dir) {
            Ok(Some((path, cfg))) => {
                log::info!("Using config: {}", path.display());
                cfg
            }
            Ok(None) => Config::default(),
            Err(e) => {
                log::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    };

    config.merge_cli(CliOptions {
        patterns: cli.patterns,
        patterns_folder: cli.patterns_folder,
        whitelist: cli.whitelist,
        blacklist: cli.blacklist,
        metrics: cli.metrics,
        format: cli.format.map(|f| match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }),
        output_file: cli.output,
        jobs: cli.jobs,
    });

    if config.patterns.is_empty() {
        miette::bail!("No pattern files given (pass them as arguments or set 'patterns' in the config)");
    }

    let mut loader = PatternLoader::new()
        .with_metrics(config.metrics.iter().cloned())
        .with_jobs(config.jobs);
    if let Some(folder) = &config.patterns_folder {
        loader = loader.with_patterns_folder(folder);
    }
    let report = loader.load(&config.patterns);

    for failure in &report.failures {
        eprintln!("{}: {}", "error".red().bold(), failure);
    }

    if cli.check {
        println!(
            "Compiled {} pattern document(s), {} failure(s)",
            report.documents.len(),
            report.failures.len()
        );
        return Ok(if report.has_failures() {
            ExitCode::from(2)
        } else {
            ExitCode::SUCCESS
        });
    }

    let Some(graph_path) = cli.graph else {
        miette::bail!("--graph is required unless --check is given");
    };
    let graph = MemoryGraph::from_file(&graph_path).into_diagnostic()?;
    log::info!("Loaded graph {} with {} node(s)", graph_path.display(), graph.len());

    let load_failed = report.has_failures();
    let filter = config.name_filter().into_diagnostic()?;
    let engine = Engine::new(report.documents).with_filter(&filter);
    let (stats, matches) = engine.run_traced(&graph);

    let colored = config.output_file.is_none() && !cli.no_color;
    let output = formatter_for(config.format, colored).format(&matches, &stats);
    match &config.output_file {
        Some(path) => fs::write(path, output).into_diagnostic()?,
        None => println!("{}", output),
    }

    if load_failed || stats.failed_documents > 0 {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::from(stats.exit_code()))
}
