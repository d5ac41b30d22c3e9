use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "evalboard",
    version,
    about = "Ingest, store and summarize LLM evaluation results"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./evalboard.yaml when present)
    #[arg(long, global = true, env = "EVALBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store location: sqlite file or json_dir directory
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// sqlite | json-dir
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// tracing filter, e.g. `info` or `evalboard_core=debug`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Reject unknown keys in the config file
    #[arg(long, global = true)]
    pub strict_config: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize and store one or more evaluation result files
    Ingest(IngestArgs),
    /// Print stored records as JSON
    List(ListArgs),
    /// Aggregate stored records into dashboard statistics
    Report(ReportArgs),
    /// Write one stage of a stored run to a standalone JSON file
    Export(ExportArgs),
    /// Write a sample config file
    Init(InitArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct IngestArgs {
    /// JSON files to ingest; `-` reads one document from stdin
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Oldest first (report order)
    #[default]
    Asc,
    /// Newest first (upload listing order)
    Desc,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value_t = Order::Asc)]
    pub order: Order,

    /// Print at most this many records
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Text,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    pub format: ReportFormat,

    /// Pass threshold override (0..=1)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Write the report here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageArg {
    Sut,
    Judge,
    Full,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(long)]
    pub id: i64,

    #[arg(long, value_enum)]
    pub kind: StageArg,

    /// Output directory
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Pass threshold used for the PASS/FAIL status of `--kind full`
    #[arg(long)]
    pub threshold: Option<f64>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,

    /// Also write a .gitignore entry for the store directory
    #[arg(long)]
    pub gitignore: bool,
}
