use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dirpair_common::{ensure_config, load_config, AppConfig, Status};
use dirpair_core::{
    CollectingSink, CompareOptions, DirComparer, FileKind, FileSide, TreeWalk, WalkEvent,
    WalkOptions,
};
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dirpair")]
#[command(author = "dirpair Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Pair and compare the entries of two directory trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two files or directories
    Compare(CompareArgs),

    /// Print the path an entry name resolves to inside a directory
    Resolve {
        /// Directory to search
        dir: PathBuf,

        /// Entry name to look up
        name: OsString,

        /// Match the name case-insensitively
        #[arg(short = 'i', long)]
        ignore_case: bool,
    },

    /// Write the default configuration file if none exists and print its path
    InitConfig {
        /// Use the configuration file next to the executable
        #[arg(long)]
        portable: bool,
    },
}

#[derive(Args)]
struct CompareArgs {
    /// Left path
    left: PathBuf,

    /// Right path
    right: PathBuf,

    /// Recursively compare common subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Ignore case when pairing file names
    #[arg(short = 'i', long)]
    ignore_file_name_case: bool,

    /// Treat absent files as empty
    #[arg(short = 'N', long)]
    new_file: bool,

    /// Report when two files are identical
    #[arg(short = 's', long)]
    report_identical_files: bool,

    /// Exclude entries whose names match the pattern (can be specified multiple times)
    #[arg(short = 'x', long = "exclude", value_name = "PAT")]
    exclude: Vec<String>,

    /// Start a directory comparison at this file name
    #[arg(short = 'S', long, value_name = "FILE")]
    starting_file: Option<OsString>,

    /// Do not follow symbolic links
    #[arg(long)]
    no_dereference: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Use the configuration file next to the executable
    #[arg(long)]
    portable: bool,
}

impl CompareArgs {
    /// Apply command-line switches on top of the loaded configuration
    fn apply_to(&self, config: &mut AppConfig) {
        config.ignore_patterns.extend(self.exclude.iter().cloned());
        config.recursive |= self.recursive;
        config.ignore_file_name_case |= self.ignore_file_name_case;
        config.new_file |= self.new_file;
        config.report_identical_files |= self.report_identical_files;
        config.no_dereference |= self.no_dereference;
    }
}

fn main() {
    // Initialize tracing to stderr (so JSON output can go cleanly to stdout)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compare(args) => run_compare(args),
        Commands::Resolve {
            dir,
            name,
            ignore_case,
        } => run_resolve(dir, name, ignore_case),
        Commands::InitConfig { portable } => run_init_config(portable),
    };

    match result {
        Ok(status) => std::process::exit(status.exit_code()),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(Status::Trouble.exit_code());
        }
    }
}

fn run_compare(args: CompareArgs) -> Result<Status> {
    let loaded = load_config(args.portable).context("loading configuration")?;
    let mut config = loaded.config;
    args.apply_to(&mut config);
    info!("Using configuration {}", loaded.path.display());

    let walk_options = WalkOptions::from_config(&config);
    let mut comparer = DirComparer::from_config(&config);
    if let Some(name) = args.starting_file.clone() {
        comparer = comparer.with_starting_file(name);
    }

    if !args.json {
        let mut print = |event: WalkEvent| println!("{}", event);
        let status = TreeWalk::new(walk_options, &mut print).compare_paths(
            &mut comparer,
            &args.left,
            &args.right,
        );
        return Ok(status);
    }

    let sink = CollectingSink::new();
    let mut comparer = comparer.with_diagnostics(sink.clone());
    let mut events = Vec::new();
    let mut collect = |event: WalkEvent| events.push(event);
    let status = TreeWalk::new(walk_options, &mut collect).compare_paths(
        &mut comparer,
        &args.left,
        &args.right,
    );

    let report = JsonReport {
        left: args.left.display().to_string(),
        right: args.right.display().to_string(),
        status,
        exit_code: status.exit_code(),
        events: events.iter().map(JsonEvent::from).collect(),
        diagnostics: sink.diagnostics().iter().map(ToString::to_string).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(status)
}

fn run_resolve(dir: PathBuf, name: OsString, ignore_case: bool) -> Result<Status> {
    let mut comparer = DirComparer::new(CompareOptions {
        ignore_file_name_case: ignore_case,
        follow_symlinks: true,
        starting_file: None,
    });
    let mut side = FileSide::new(dir);
    let resolved = comparer.resolve(&mut side, &name);
    println!("{}", resolved.display());
    Ok(Status::Same)
}

fn run_init_config(portable: bool) -> Result<Status> {
    let loaded = ensure_config(portable).context("writing configuration")?;
    if loaded.exists {
        info!("Configuration already present");
    }
    println!("{}", loaded.path.display());
    Ok(Status::Same)
}

#[derive(Serialize)]
struct JsonReport {
    left: String,
    right: String,
    status: Status,
    exit_code: i32,
    events: Vec<JsonEvent>,
    diagnostics: Vec<String>,
}

#[derive(Serialize)]
struct JsonEvent {
    kind: &'static str,
    left: Option<String>,
    right: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    left_kind: Option<FileKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    right_kind: Option<FileKind>,
    message: String,
}

impl From<&WalkEvent> for JsonEvent {
    fn from(event: &WalkEvent) -> Self {
        let path = |p: &PathBuf| Some(p.display().to_string());
        let (kind, left, right) = match event {
            WalkEvent::OnlyIn { dir, name } => ("only_in", path(&dir.join(name)), None),
            WalkEvent::CommonSubdirectories { left, right } => {
                ("common_subdirectories", path(left), path(right))
            }
            WalkEvent::Identical { left, right } => ("identical", path(left), path(right)),
            WalkEvent::Differ { left, right } => ("differ", path(left), path(right)),
            WalkEvent::KindMismatch { left, right, .. } => ("kind_mismatch", path(left), path(right)),
            WalkEvent::Trouble { path: p, .. } => ("trouble", path(p), None),
        };
        let (left_kind, right_kind) = match event {
            WalkEvent::KindMismatch {
                left_kind,
                right_kind,
                ..
            } => (Some(*left_kind), Some(*right_kind)),
            _ => (None, None),
        };
        JsonEvent {
            kind,
            left,
            right,
            left_kind,
            right_kind,
            message: event.to_string(),
        }
    }
}
