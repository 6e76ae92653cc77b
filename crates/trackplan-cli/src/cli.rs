use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan",
    version,
    about = "trackplan - generate and check model-railway track layouts that fit your board, built from standard set-track pieces.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel layout search.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate ranked candidate layouts for a board.
    Generate(GenerateArgs),
    /// Check a saved layout for overlaps, pieces off the board and bad joints.
    Validate(ValidateArgs),
    /// List or export the piece catalogue.
    Catalogue(CatalogueArgs),
}

/// Where the board outline comes from. At most one may be given on the command line.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
pub struct BoardSource {
    /// Board outline JSON: a `{description, polygon, holes}` object or a saved plan with a board.
    #[arg(short, long, value_name = "PATH")]
    pub board: Option<PathBuf>,

    /// Rectangular board of WIDTHxHEIGHT millimetres (e.g. 1800x1200).
    #[arg(long, value_name = "WxH")]
    pub rectangle: Option<String>,
}

/// Arguments for the `generate` subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    // --- Core Arguments ---
    /// Directory the layout-N.json files are written to.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub board: BoardSource,

    // --- Catalogue Overrides ---
    /// Custom catalogue TOML used instead of the built-in Hornby OO range.
    #[arg(long, value_name = "PATH")]
    pub catalogue: Option<PathBuf>,

    /// Restrict the catalogue to these piece codes (comma separated).
    #[arg(short, long, value_name = "CODES", value_delimiter = ',')]
    pub pieces: Vec<String>,

    // --- Objective Overrides ---
    /// Named objective preset: balanced, density, straights or loops.
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Override one objective weight. Can be used multiple times.
    /// Example: -w loops=1.0
    #[arg(short, long = "weight", value_name = "OBJECTIVE=WEIGHT")]
    pub weights: Vec<String>,

    // --- Search Overrides ---
    /// Branches kept after each expansion round.
    #[arg(long, value_name = "INT")]
    pub beam_width: Option<usize>,

    /// Maximum number of pieces in a layout.
    #[arg(short, long, value_name = "INT")]
    pub max_pieces: Option<usize>,

    /// Number of candidate layouts to write.
    #[arg(short, long, value_name = "INT")]
    pub num_candidates: Option<usize>,

    /// Stop searching after this many seconds and keep what was found.
    #[arg(short, long, value_name = "SECONDS")]
    pub time_budget: Option<f64>,

    /// Seed for the tie-breaking random key.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Also write a bill of materials (layout-N.csv) next to every layout.
    #[arg(long)]
    pub bom: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S search.beam-width=32
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Saved plan JSON to check.
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to a configuration file in TOML format (board, tolerances, catalogue).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Board to check against when the plan carries none (or to replace it).
    #[command(flatten)]
    pub board: BoardSource,

    /// Custom catalogue TOML used instead of the built-in Hornby OO range.
    #[arg(long, value_name = "PATH")]
    pub catalogue: Option<PathBuf>,

    /// Write the plan's bill of materials to this CSV file.
    #[arg(long, value_name = "PATH")]
    pub bom: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Example: -S tolerances.position-eps-mm=2.0
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `catalogue` subcommand.
#[derive(Args, Debug)]
pub struct CatalogueArgs {
    /// Custom catalogue TOML to list instead of the built-in range.
    #[arg(long, value_name = "PATH")]
    pub catalogue: Option<PathBuf>,

    /// Write the catalogue as TOML to this path, as a starting point for a custom one.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}
