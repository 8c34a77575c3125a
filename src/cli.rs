use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "tile-sovereignty",
    version,
    about = "Label map tiles with the countries they intersect"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (error|warn|info|debug|trace)
    #[arg(long, default_value = "info", global = true)]
    pub log: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize and partition boundaries, storing the artifacts.
    Prepare(PrepareArgs),
    /// Build (or restore) the warmed tile cache.
    Warm(WarmArgs),
    /// Print the label of individual tiles.
    Resolve(ResolveArgs),
    /// Label `date,z,x,y,count` records.
    Label(LabelArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// GeoJSON file or directory of `{ISO}-{osm_id}.geojson` files
    pub boundaries: PathBuf,

    /// Directory for hash-keyed artifacts and the persisted tile cache
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Restrict the run to one ISO country code
    #[arg(long, conflicts_with = "rel")]
    pub country: Option<String>,

    /// Restrict the run to one boundary relation id
    #[arg(long)]
    pub rel: Option<i64>,

    #[arg(long, default_value_t = 10)]
    pub negative_step: u32,

    #[arg(long, default_value_t = 8)]
    pub partition_zoom: u8,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Debug, Clone, Args)]
pub struct WarmupArgs {
    /// Skip warming and start ancestor walks at this zoom
    #[arg(long)]
    pub min_cache_zoom: Option<u8>,

    /// Warm every level up to this zoom instead of stopping at the first
    /// level with an unambiguous tile
    #[arg(long)]
    pub warm_zoom: Option<u8>,

    #[arg(long, default_value_t = 19)]
    pub max_warm_zoom: u8,
}

#[derive(Debug, Args)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub output: ReportFormat,
}

#[derive(Debug, Args)]
pub struct WarmArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub warm: WarmupArgs,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub output: ReportFormat,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Tiles in z/x/y form
    #[arg(required = true)]
    pub tiles: Vec<String>,

    #[command(flatten)]
    pub warm: WarmupArgs,
}

#[derive(Debug, Args)]
pub struct LabelArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Records file; stdin when omitted
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub min_zoom: Option<u8>,

    #[arg(long)]
    pub max_zoom: Option<u8>,

    /// Drop tiles labeled "??" (default for --country/--rel runs)
    #[arg(long, default_value_t = false, conflicts_with = "keep_unknown")]
    pub drop_unknown: bool,

    #[arg(long, default_value_t = false)]
    pub keep_unknown: bool,

    /// Format of the run summary written to stderr
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,

    #[command(flatten)]
    pub warm: WarmupArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
    Ndjson,
}
