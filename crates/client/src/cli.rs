use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use runtime::TickMode;

/// Discrete-event combat rotation simulator
#[derive(Parser)]
#[command(name = "rotation")]
#[command(about = "Simulate and replay combat rotations", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Also write logs to `rotation.log` in this directory
    #[arg(long, global = true, value_name = "DIR", env = "ROTATION_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log at DEBUG unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Play skills in order, each as soon as it is available
    Play(PlayArgs),

    /// Replay a saved action record
    Replay(ReplayArgs),

    /// Validate a job definition and config without simulating
    Check(ContentArgs),
}

/// Where job, config and party data come from. Bundled samples by default.
#[derive(Args, Clone, Debug)]
pub struct ContentArgs {
    /// Job definition (RON)
    #[arg(short, long, value_name = "FILE")]
    pub job: Option<PathBuf>,

    /// Simulation config (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Party buff windows (RON)
    #[arg(short, long, value_name = "FILE", conflicts_with = "sample_party")]
    pub party: Option<PathBuf>,

    /// Use the bundled two-minute party buff windows
    #[arg(long)]
    pub sample_party: bool,
}

#[derive(Args)]
pub struct PlayArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// Skill names; `name@N` hits N targets
    #[arg(required = true, value_name = "SKILL")]
    pub skills: Vec<String>,

    /// Save the accepted requests as a record with this name
    #[arg(long, value_name = "NAME")]
    pub save: Option<String>,

    #[command(flatten)]
    pub records: RecordsArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// Saved record name
    #[arg(short, long, value_name = "NAME", required_unless_present = "file")]
    pub name: Option<String>,

    /// Record file path, instead of a saved name
    #[arg(short, long, value_name = "FILE", conflicts_with = "name")]
    pub file: Option<PathBuf>,

    /// Time control
    #[arg(short, long, value_enum, default_value = "instant")]
    pub mode: ReplayMode,

    /// Simulated seconds per wall-clock second for real-time modes
    #[arg(long, default_value = "1.0")]
    pub speed: f64,

    #[command(flatten)]
    pub records: RecordsArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct RecordsArgs {
    /// Directory of saved records
    #[arg(long, value_name = "DIR", env = "ROTATION_RECORDS_DIR", default_value = "records")]
    pub records_dir: PathBuf,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Seconds to keep simulating after the last request
    #[arg(long, default_value = "60.0")]
    pub settle: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReplayMode {
    /// No wall clock, jump straight from request to request
    Instant,
    /// Wall clock paces the simulation
    RealTime,
    /// Wall clock, paused whenever a request could be made
    AutoPause,
}

impl ReplayMode {
    pub fn tick_mode(self) -> Option<TickMode> {
        match self {
            Self::Instant => None,
            Self::RealTime => Some(TickMode::RealTime),
            Self::AutoPause => Some(TickMode::RealTimeAutoPause),
        }
    }
}
