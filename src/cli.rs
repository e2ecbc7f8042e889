use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffmatrix")]
#[command(author, version, about = "Empirical ffmpeg codec/container compatibility tool")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the compatibility matrix file (overrides config)
    #[arg(short, long, global = true)]
    pub matrix: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the compatibility matrix by probing every codec against every
    /// output container
    Build {
        /// Concurrent encode probes per container
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Show the matrix entry for one container format
    Query {
        /// Container format name (e.g. mp4, matroska)
        container: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the matrix by codec and/or extension
    Search {
        /// Required video codec
        #[arg(long)]
        video_codec: Option<String>,

        /// Required audio codec
        #[arg(long)]
        audio_codec: Option<String>,

        /// Required file extension
        #[arg(long)]
        extension: Option<String>,
    },

    /// List output container formats with muxer cross-references
    Formats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all encoders
    Encoders {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show parsed settings for one encoder
    InspectCodec {
        /// Encoder name (e.g. libx264, aac)
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show parsed settings for one muxer
    InspectMuxer {
        /// Muxer name (e.g. mp4, matroska)
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve transcode parameters from a media file
    Resolve {
        /// File to probe for source parameters
        #[arg(required = true)]
        probe_file: PathBuf,

        /// File the transcode will read (defaults to a placeholder)
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// File the transcode will write (defaults to a placeholder)
        #[arg(long)]
        output_file: Option<PathBuf>,

        /// Execute the resulting ffmpeg command
        #[arg(long)]
        run: bool,

        /// Output the resolved profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare detailed metadata from two files
    Compare {
        /// Path of the source file
        source: PathBuf,

        /// Path of the destination file
        dest: PathBuf,

        /// Display differences between metadata
        #[arg(long)]
        diff: bool,

        /// Display matches between metadata
        #[arg(long)]
        matches: bool,
    },

    /// Check that required external tools are available
    CheckTools,
}
