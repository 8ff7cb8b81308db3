#![deny(trivial_casts, trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(missing_debug_implementations, missing_docs, unused_qualifications, unused_import_braces)]

//! Shared argument parsing, configuration loading and error-to-exit-code
//! mapping for the four `cardutil` command-line tools.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::Args;
use snafu::Snafu;
use tracing::Level;

use cardutil_core::{CardutilConfig, Error as CoreError};
use cardutil_encoding::TextEncoding;

/// Flags shared by every `cardutil` CLI tool.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// The input file to read.
    pub in_filename: PathBuf,

    /// The output file to write (standard output if omitted).
    #[arg(short = 'o', long = "out-filename")]
    pub out_filename: Option<PathBuf>,

    /// Wire character encoding of the input file.
    #[arg(long = "in-encoding", default_value = "cp500")]
    pub in_encoding: String,

    /// Wire character encoding of the output file.
    #[arg(long = "out-encoding", default_value = "cp500")]
    pub out_encoding: String,

    /// Treat the file as bare VBS records with no 1014-byte block
    /// envelope.
    #[arg(long = "no1014blocking")]
    pub no1014blocking: bool,

    /// Path to the cardutil configuration document. Defaults to
    /// `$CARDUTIL_CONFIG/cardutil.json`.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// Print more diagnostic detail to standard error.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load configuration the way every tool resolves it: an explicit
    /// `--config-file` if given, otherwise `$CARDUTIL_CONFIG/cardutil.json`.
    pub fn load_config(&self) -> Result<CardutilConfig, CliError> {
        Ok(CardutilConfig::load(self.config_file.as_deref())?)
    }

    /// Parse the declared input wire encoding.
    pub fn in_encoding(&self) -> Result<TextEncoding, CliError> {
        Ok(TextEncoding::from_name(&self.in_encoding)?)
    }

    /// Parse the declared output wire encoding.
    pub fn out_encoding(&self) -> Result<TextEncoding, CliError> {
        Ok(TextEncoding::from_name(&self.out_encoding)?)
    }

    /// Whether the 1014-byte block envelope is in effect (the default).
    pub fn use_1014_blocking(&self) -> bool {
        !self.no1014blocking
    }

    /// Open the input file for buffered reading.
    pub fn open_input(&self) -> Result<BufReader<File>, CliError> {
        Ok(BufReader::new(File::open(&self.in_filename)?))
    }

    /// Open the output: the named file under `-o`, otherwise standard
    /// output.
    pub fn open_output(&self) -> Result<Box<dyn Write>, CliError> {
        Ok(match &self.out_filename {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(io::stdout()),
        })
    }
}

/// Install the global `tracing` subscriber used by every binary, at
/// `DEBUG` when `verbose` is set and `INFO` otherwise.
pub fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .finish();
    // Only the first binary invoked within a process gets to install the
    // subscriber; later calls (e.g. from integration tests) are no-ops.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// The error type shared by every `cardutil` CLI binary.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum CliError {
    /// An error from the `cardutil` toolkit itself.
    #[snafu(display("{source}"))]
    Cardutil {
        /// The underlying toolkit error.
        source: CoreError,
    },
    /// A filesystem or stream I/O failure.
    #[snafu(display("I/O error: {source}"))]
    Io {
        /// The underlying I/O error.
        source: io::Error,
    },
    /// A malformed CSV document.
    #[snafu(display("CSV error: {source}"))]
    Csv {
        /// The underlying CSV error.
        source: csv::Error,
    },
    /// The caller asked for a parameter table that the configuration does
    /// not declare.
    #[snafu(display("parameter table {table_id:?} is not declared in the configuration"))]
    UnknownParamTable {
        /// The requested table id.
        table_id: String,
    },
}

impl From<CoreError> for CliError {
    fn from(source: CoreError) -> Self {
        CliError::Cardutil { source }
    }
}

impl From<io::Error> for CliError {
    fn from(source: io::Error) -> Self {
        CliError::Io { source }
    }
}

impl From<csv::Error> for CliError {
    fn from(source: csv::Error) -> Self {
        CliError::Csv { source }
    }
}

impl CliError {
    /// Map this error onto a process exit code. Codes 1 through 8 mirror
    /// the toolkit's own error taxonomy (spec §7); 9 and above are
    /// CLI-local conditions.
    pub fn to_exit_code(&self) -> i32 {
        match self {
            CliError::Cardutil { source } => match source {
                CoreError::Config { .. } => 1,
                CoreError::Encoding { .. } => 2,
                CoreError::Field { .. } => 3,
                CoreError::Pds { .. } => 4,
                CoreError::Bitmap { .. } => 5,
                CoreError::Block { .. } => 6,
                CoreError::Truncated { .. } => 7,
                CoreError::Io { .. } => 8,
                _ => 9,
            },
            CliError::Io { .. } => 8,
            CliError::Csv { .. } => 10,
            CliError::UnknownParamTable { .. } => 11,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_maps_to_exit_code_one() {
        let err: CliError = CoreError::config("bad").into();
        assert_eq!(err.to_exit_code(), 1);
    }

    #[test]
    fn unknown_param_table_has_its_own_exit_code() {
        let err = CliError::UnknownParamTable { table_id: "9".into() };
        assert_eq!(err.to_exit_code(), 11);
    }
}
