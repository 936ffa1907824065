//! Tinbergen CLI - Command-line interface for Tinbergen Core
//!
//! Commands:
//! - inspect: Summarize a project, its ethogram, and its observation sets
//! - table: Resample a project's observations onto a uniform grid
//! - keyvals: Parse keyval strings and print the records

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tinbergen_core::convert::numeric;
use tinbergen_core::keyval::parse_keyvals;
use tinbergen_core::table::{build_tables, BinSide, TableConfig};
use tinbergen_core::types::{Column, TableSet};
use tinbergen_core::{load_project, TinbergenError, ValueConverter, TINBERGEN_VERSION};

/// Tinbergen - Parse and resample behavioral observation files
#[derive(Parser)]
#[command(name = "tinbergen")]
#[command(version = TINBERGEN_VERSION)]
#[command(about = "Turn coded behavioral observations into time-aligned tables", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a project
    Inspect {
        /// Project file (.tbproject)
        project: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resample every observation set of a project
    Table {
        /// Project file (.tbproject)
        project: PathBuf,

        /// Start of the grid in seconds
        #[arg(long, default_value = "0")]
        start: f64,

        /// End of the grid in seconds (exclusive)
        #[arg(long)]
        end: f64,

        /// Samples per second
        #[arg(long)]
        rate: f64,

        /// Table config file (JSON); flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Edge of each bin to sample
        #[arg(long)]
        bin_side: Option<BinSideArg>,

        /// Distance from the sampled edge, as a fraction of a bin
        #[arg(long)]
        bin_tol: Option<f64>,

        /// Initial value for binary behaviors
        #[arg(long)]
        initial_binary: Option<InitialBinary>,

        /// Parse the values of this behavior as numbers (repeatable)
        #[arg(long = "numeric")]
        numeric_behaviors: Vec<String>,

        /// Keep binary values as text
        #[arg(long)]
        raw_binary: bool,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        format: OutputFormat,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Parse keyval strings
    Keyvals {
        /// Strings such as 'name=Peck kind=moment'
        #[arg(required = true)]
        strings: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BinSideArg {
    Left,
    Right,
}

impl From<BinSideArg> for BinSide {
    fn from(side: BinSideArg) -> Self {
        match side {
            BinSideArg::Left => BinSide::Left,
            BinSideArg::Right => BinSide::Right,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum InitialBinary {
    True,
    False,
    /// No initial value; queries before the first observation fail
    None,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON document of all tables
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Comma-separated values
    Csv,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), TinbergenCliError> {
    match command {
        Commands::Inspect { project, json } => cmd_inspect(&project, json),

        Commands::Table {
            project,
            start,
            end,
            rate,
            config,
            bin_side,
            bin_tol,
            initial_binary,
            numeric_behaviors,
            raw_binary,
            format,
            output,
        } => {
            let mut table_config = match config {
                Some(path) => TableConfig::from_json(&fs::read_to_string(path)?)?,
                None => TableConfig::default(),
            };
            if let Some(side) = bin_side {
                table_config.bin_side = side.into();
            }
            if let Some(tol) = bin_tol {
                table_config.bin_tol = tol;
            }
            if let Some(init) = initial_binary {
                table_config.initial_binary = match init {
                    InitialBinary::True => Some(true),
                    InitialBinary::False => Some(false),
                    InitialBinary::None => None,
                };
            }

            let converter = numeric_behaviors
                .into_iter()
                .fold(ValueConverter::new(), |c, name| c.with_converter(name, numeric()))
                .with_binary_conversion(!raw_binary);

            cmd_table(&project, start, end, rate, &table_config, &converter, &format, &output)
        }

        Commands::Keyvals { strings } => cmd_keyvals(&strings),
    }
}

fn cmd_inspect(project_path: &Path, json: bool) -> Result<(), TinbergenCliError> {
    let data = load_project(project_path, &ValueConverter::default())?;

    let report = InspectReport {
        project_root: data.project.project_root.display().to_string(),
        video_root: data.project.video_root.display().to_string(),
        ethogram: data.ethogram.name.clone(),
        behaviors: data
            .ethogram
            .behaviors
            .iter()
            .map(|b| BehaviorSummary {
                name: b.name.clone(),
                kind: b.kind.to_string(),
            })
            .collect(),
        observers: data
            .project
            .observers
            .iter()
            .map(|o| format!("{} ({})", o.name, o.code))
            .collect(),
        observation_sets: data
            .observations
            .iter()
            .map(|s| SetSummary {
                source: s.source.clone(),
                observer: s.observer.clone(),
                observations: s.observation_count(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Tinbergen Project");
    println!("=================");
    println!("Project root: {}", report.project_root);
    println!("Video root:   {}", report.video_root);
    println!("Ethogram:     {}", report.ethogram);
    println!("\nBehaviors:");
    for behavior in &report.behaviors {
        println!("  - {} [{}]", behavior.name, behavior.kind);
    }
    println!("\nObservers:");
    for observer in &report.observers {
        println!("  - {}", observer);
    }
    println!("\nObservation sets: {}", report.observation_sets.len());
    for set in &report.observation_sets {
        println!("  - {} by {}: {} observations", set.source, set.observer, set.observations);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_table(
    project_path: &Path,
    start: f64,
    end: f64,
    rate: f64,
    config: &TableConfig,
    converter: &ValueConverter,
    format: &OutputFormat,
    output: &Path,
) -> Result<(), TinbergenCliError> {
    let data = load_project(project_path, converter)?;
    if data.observations.is_empty() {
        return Err(TinbergenCliError::NoObservations);
    }

    let tables = build_tables(&data.observations, start, end, rate, config)?;
    let output_data = format_output(&tables, format)?;

    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(output_data.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_keyvals(strings: &[String]) -> Result<(), TinbergenCliError> {
    let records: Vec<_> = strings.iter().map(|s| parse_keyvals(s)).collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

// Helper functions

/// Rows of one table (or of a stacked table) with their labels
struct RowBlock<'a> {
    sources: Vec<&'a str>,
    observers: Vec<&'a str>,
    columns: &'a [Column],
}

fn row_blocks(tables: &TableSet) -> Vec<RowBlock<'_>> {
    match tables {
        TableSet::Stacked(stacked) => vec![RowBlock {
            sources: stacked.source.iter().map(String::as_str).collect(),
            observers: stacked.observer.iter().map(String::as_str).collect(),
            columns: &stacked.columns,
        }],
        TableSet::Separate { tables } => tables
            .iter()
            .map(|t| RowBlock {
                sources: vec![t.source.as_str(); t.len()],
                observers: vec![t.observer.as_str(); t.len()],
                columns: &t.columns,
            })
            .collect(),
    }
}

fn format_output(tables: &TableSet, format: &OutputFormat) -> Result<String, TinbergenCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for block in row_blocks(tables) {
                for row in 0..block.sources.len() {
                    let mut object = serde_json::Map::new();
                    object.insert("source".to_string(), block.sources[row].into());
                    object.insert("observer".to_string(), block.observers[row].into());
                    for column in block.columns {
                        object.insert(column.name.clone(), serde_json::to_value(&column.values[row])?);
                    }
                    lines.push(serde_json::Value::Object(object).to_string());
                }
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(tables)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(tables)?),
        OutputFormat::Csv => {
            // Separate tables may differ in width; each block gets its own header
            let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
            for block in row_blocks(tables) {
                let mut header = vec!["source", "observer"];
                header.extend(block.columns.iter().map(|c| c.name.as_str()));
                writer.write_record(&header)?;

                for row in 0..block.sources.len() {
                    let mut record = vec![block.sources[row].to_string(), block.observers[row].to_string()];
                    record.extend(block.columns.iter().map(|c| c.values[row].to_string()));
                    writer.write_record(&record)?;
                }
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| TinbergenCliError::Io(e.into_error()))?;
            String::from_utf8(bytes).map_err(|e| TinbergenCliError::Encoding(e.to_string()))
        }
    }
}

// Error types

#[derive(Debug)]
enum TinbergenCliError {
    Io(io::Error),
    Core(TinbergenError),
    Json(serde_json::Error),
    Csv(csv::Error),
    Encoding(String),
    NoObservations,
}

impl From<io::Error> for TinbergenCliError {
    fn from(e: io::Error) -> Self {
        TinbergenCliError::Io(e)
    }
}

impl From<TinbergenError> for TinbergenCliError {
    fn from(e: TinbergenError) -> Self {
        TinbergenCliError::Core(e)
    }
}

impl From<serde_json::Error> for TinbergenCliError {
    fn from(e: serde_json::Error) -> Self {
        TinbergenCliError::Json(e)
    }
}

impl From<csv::Error> for TinbergenCliError {
    fn from(e: csv::Error) -> Self {
        TinbergenCliError::Csv(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TinbergenCliError> for CliError {
    fn from(e: TinbergenCliError) -> Self {
        match e {
            TinbergenCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TinbergenCliError::Core(e) => {
                let hint = match &e {
                    TinbergenError::Io { .. } => "Check the paths in the project file",
                    TinbergenError::MissingInitialValue | TinbergenError::MissingInitialValueFor { .. } => {
                        "Set an initial value in --config or start the grid later"
                    }
                    TinbergenError::InvalidRate(_) => "Use a positive --rate",
                    TinbergenError::InvalidGrid(_) => "Use finite --start and --end values",
                    TinbergenError::DuplicateObserver(_) => "Give each observer a unique code",
                    TinbergenError::Json(_) => "Check the --config JSON",
                    _ => "Check the Tinbergen file syntax",
                };
                CliError {
                    code: "TINBERGEN_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            TinbergenCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            TinbergenCliError::Csv(e) => CliError {
                code: "CSV_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            TinbergenCliError::Encoding(msg) => CliError {
                code: "ENCODING_ERROR".to_string(),
                message: msg,
                hint: None,
            },
            TinbergenCliError::NoObservations => CliError {
                code: "NO_OBSERVATIONS".to_string(),
                message: "No observation files found under the project root".to_string(),
                hint: Some("Check project-root in the project file".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    project_root: String,
    video_root: String,
    ethogram: String,
    behaviors: Vec<BehaviorSummary>,
    observers: Vec<String>,
    observation_sets: Vec<SetSummary>,
}

#[derive(serde::Serialize)]
struct BehaviorSummary {
    name: String,
    kind: String,
}

#[derive(serde::Serialize)]
struct SetSummary {
    source: String,
    observer: String,
    observations: usize,
}
