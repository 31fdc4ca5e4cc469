use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};
use ltc::{
    DisplayMode,
    FrameRate,
    ParityPolicy,
    TimeCode,
    UserBits,
};

#[derive(Debug, Parser)]
#[clap(version, about = "Decode and generate SMPTE linear timecode")]
pub struct Args {
    /// Config file. Defaults to `config.toml` in the config directory, if it
    /// exists.
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decode timecodes from an edge file.
    Decode(DecodeArgs),

    /// Print the bits of a single frame.
    Encode(EncodeArgs),

    /// Write an edge file for consecutive timecodes.
    Generate(GenerateArgs),
}

#[derive(Debug, clap::Args)]
pub struct DecodeArgs {
    /// CSV file with a `time` column of edge timestamps in seconds. Reads from
    /// stdin if omitted.
    pub input: Option<PathBuf>,

    /// Output format: compact, labeled or index
    #[clap(short, long)]
    pub display: Option<DisplayMode>,

    /// Frame rate of the signal. Measured if omitted.
    #[clap(short, long)]
    pub rate: Option<FrameRate>,

    /// What to do with frames that fail the parity check: report or reject
    #[clap(short, long)]
    pub parity: Option<ParityPolicy>,

    /// Number of edges to ignore while the bit clock settles.
    #[clap(long)]
    pub settle_ticks: Option<u32>,

    /// Also print frames that were dropped.
    #[clap(long)]
    pub show_dropped: bool,
}

#[derive(Debug, clap::Args)]
pub struct EncodeArgs {
    /// Timecode as HH:MM:SS:FF. Use `;` before the frames for drop-frame.
    pub timecode: TimeCode,

    /// User bits as 8 hex digits
    #[clap(short, long)]
    pub user_bits: Option<UserBits>,

    /// Check the frame number against this rate.
    #[clap(short, long)]
    pub rate: Option<FrameRate>,

    #[clap(long)]
    pub color_frame: bool,
}

#[derive(Debug, clap::Args)]
pub struct GenerateArgs {
    /// Timecode of the first frame
    pub start: TimeCode,

    #[clap(short, long, default_value = "25")]
    pub rate: FrameRate,

    /// Number of frames to generate
    #[clap(short = 'n', long, default_value = "25")]
    pub frames: usize,

    /// User bits as 8 hex digits
    #[clap(short, long)]
    pub user_bits: Option<UserBits>,

    /// Timestamp of the first edge in seconds
    #[clap(long, default_value = "0")]
    pub start_time: f64,

    /// Output file. Writes to stdout if omitted.
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}
