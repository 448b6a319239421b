//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "reptrack", version, about = "Count exercise reps from pose landmark streams")]
pub struct Cli {
    /// Path to config TOML (built-in defaults when omitted)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Append finished session records here (overrides [history].file)
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Where frames come from and how they are consumed.
#[derive(clap::Args, Debug, Clone)]
pub struct InputArgs {
    /// JSON-lines frame file, or `-` for stdin
    #[arg(long, short, value_name = "FILE")]
    pub input: PathBuf,

    /// Read frames on a background thread, keeping only the newest
    /// (overrides [runner].mode)
    #[arg(long, action = ArgAction::SetTrue)]
    pub feed: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count reps of one exercise over a recorded frame stream
    Replay {
        /// Exercise id (see `reptrack exercises`)
        #[arg(long, short)]
        exercise: String,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Timed sets with rest periods and random exercise picks
    Timed {
        #[command(flatten)]
        input: InputArgs,
        /// Always use this exercise (overrides [timed].fixed_exercise)
        #[arg(long, value_name = "ID")]
        exercise: Option<String>,
        /// Number of sets (overrides [timed].total_sets)
        #[arg(long)]
        sets: Option<u32>,
        /// Seed for exercise picks; random when omitted
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Pyramid rep targets with rest scaled by the reps just done
    Ladder {
        /// Exercise id
        #[arg(long, short)]
        exercise: String,
        /// JSON-lines frame file, or `-` for stdin
        #[arg(long, short, value_name = "FILE", required_unless_present = "preview")]
        input: Option<PathBuf>,
        /// Read frames on a background thread (overrides [runner].mode)
        #[arg(long, action = ArgAction::SetTrue)]
        feed: bool,
        /// Print the rep targets and exit
        #[arg(long, action = ArgAction::SetTrue)]
        preview: bool,
        /// Weight recorded with every set
        #[arg(long, value_name = "KG")]
        weight: Option<f32>,
    },
    /// Walk a workout plan of sets and repeated circuits
    Plan {
        /// Workout plan TOML
        #[arg(long, short, value_name = "FILE")]
        plan: PathBuf,
        /// JSON-lines frame file, or `-` for stdin
        #[arg(long, short, value_name = "FILE", required_unless_present = "dry_run")]
        input: Option<PathBuf>,
        /// Read frames on a background thread (overrides [runner].mode)
        #[arg(long, action = ArgAction::SetTrue)]
        feed: bool,
        /// List the steps the plan expands to and exit
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// List known exercises and report definition problems
    Exercises,
}
