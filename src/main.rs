// SPDX-License-Identifier: GPL-3.0-only

use clap::{Args, Parser, Subcommand};
use depth_recorder::config::{SequencePolicy, SourceKind};
use depth_recorder::pipelines::color::EncodingFormat;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "depth-recorder")]
#[command(about = "Record paced color images and point clouds from a depth camera")]
#[command(version = depth_recorder::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record color images and point clouds (default)
    Record(RecordArgs),

    /// List depth cameras
    List,

    /// Print a summary of a recorded point cloud file
    Inspect {
        /// Point cloud file (raw little-endian f32)
        file: PathBuf,

        /// Depth raster width the file was recorded with
        #[arg(short, long, default_value = "640")]
        width: u32,
    },
}

/// Options of the record command; unset flags keep the config file value
#[derive(Args, Default)]
pub struct RecordArgs {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Frame source
    #[arg(short, long, value_enum)]
    pub source: Option<SourceKind>,

    /// Color device node (with --depth-device, skips discovery)
    #[arg(long)]
    pub color_device: Option<String>,

    /// Depth device node
    #[arg(long)]
    pub depth_device: Option<String>,

    /// Base directory; output goes to <DIR>/recordings (default: home)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target color frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Storage ceiling for the recordings tree, in GB
    #[arg(long)]
    pub budget_gb: Option<f64>,

    /// Color image format
    #[arg(long, value_enum)]
    pub format: Option<EncodingFormat>,

    /// Block up to this many milliseconds waiting for a capture instead of
    /// busy polling
    #[arg(long)]
    pub wait_ms: Option<u64>,

    /// How color and point cloud files share sequence numbers
    #[arg(long, value_enum)]
    pub sequence_policy: Option<SequencePolicy>,

    /// Stop after this many captures
    #[arg(long)]
    pub max_captures: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=depth_recorder=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Record(args)) => cli::record(args),
        Some(Commands::List) => cli::list_devices(),
        Some(Commands::Inspect { file, width }) => cli::inspect(&file, width),
        None => cli::record(RecordArgs::default()),
    }
}
