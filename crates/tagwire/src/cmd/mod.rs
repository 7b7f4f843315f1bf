use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod envelope;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a JSON document as a message.
    Encode(EncodeArgs),
    /// Decode a message and print its value.
    Decode(DecodeArgs),
    /// Decode a response envelope; exits 1 when it reports failure.
    Envelope(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Envelope(args) => envelope::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON document to encode. Reads stdin when neither --json nor --file
    /// is given.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the JSON document from a file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Write the message to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub out: Option<PathBuf>,
    /// Write lowercase hex instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
    /// Wrap the input list as the "data" of a response envelope.
    #[arg(long)]
    pub envelope: bool,
    /// Add a traceback line to the envelope (repeatable).
    #[arg(long, value_name = "LINE", requires = "envelope")]
    pub traceback: Vec<String>,
    /// Leave "data" out of the envelope; no input is read.
    #[arg(long, requires = "envelope", conflicts_with_all = ["json", "file"])]
    pub no_data: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Message file. Reads stdin when neither a path nor --hex is given.
    #[arg(conflicts_with = "hex")]
    pub path: Option<PathBuf>,
    /// Message as hex text.
    #[arg(long, value_name = "HEX")]
    pub hex: Option<String>,
    /// Maximum nesting depth accepted.
    #[arg(
        long,
        value_name = "N",
        env = "TAGWIRE_MAX_DEPTH",
        default_value_t = tagwire_codec::DEFAULT_MAX_DEPTH
    )]
    pub max_depth: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
