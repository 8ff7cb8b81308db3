//! The error taxonomy shared by every cardutil codec.
//!
//! Each variant corresponds to one of the failure classes named by the
//! on-the-wire and file-framing contracts: a malformed field table is a
//! [`Error::Config`], a byte sequence that cannot be translated under the
//! selected character encoding is an [`Error::Encoding`], and so on. Field-
//! level errors carry the offending field index so that a caller can point
//! a diagnostic at the right place in the message.

use snafu::{Backtrace, Snafu};

/// The result type returned throughout the cardutil codecs.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The main error type for the cardutil toolkit.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The field configuration is missing a required entry or is otherwise
    /// malformed (unknown `type`/`data_type`, non-numeric field index, ...).
    #[snafu(display("configuration error: {message}"))]
    Config {
        /// Description of the configuration problem.
        message: String,
        backtrace: Backtrace,
    },

    /// A byte or character could not be translated under the selected
    /// encoding.
    #[snafu(display("encoding error in field {field}: {message}"))]
    Encoding {
        /// The field index that was being encoded or decoded.
        field: u32,
        /// Description of the untranslatable byte or character.
        message: String,
        backtrace: Backtrace,
    },

    /// A field violated its declared length, type, or format.
    #[snafu(display("field {field} error: {message}"))]
    Field {
        /// The field index that failed to decode or encode.
        field: u32,
        /// Description of the violation.
        message: String,
        backtrace: Backtrace,
    },

    /// A PDS (Private Data Subfield) container payload did not parse
    /// cleanly.
    #[snafu(display("PDS error in field {field}: {message}"))]
    Pds {
        /// The container field index.
        field: u32,
        /// Description of the parse failure.
        message: String,
        backtrace: Backtrace,
    },

    /// The primary or secondary bitmap could not be reconciled with the
    /// fields actually present.
    #[snafu(display("bitmap error: {message}"))]
    Bitmap {
        /// Description of the inconsistency.
        message: String,
        backtrace: Backtrace,
    },

    /// A 1014-byte block framing violation (short block, bad fill bytes).
    #[snafu(display("1014-block framing error: {message}"))]
    Block {
        /// Description of the violation.
        message: String,
        backtrace: Backtrace,
    },

    /// End of stream was reached in the middle of a record or before the
    /// VBS terminator.
    #[snafu(display("truncated stream: {message}"))]
    Truncated {
        /// Description of where truncation was detected.
        message: String,
        backtrace: Backtrace,
    },

    /// The underlying byte source or sink failed.
    #[snafu(display("I/O error: {source}"))]
    Io {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            source,
            backtrace: Backtrace::new(),
        }
    }
}

impl Error {
    /// Build a [`Error::Config`] from a displayable message.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }

    /// Build a [`Error::Encoding`] for the given field index.
    pub fn encoding(field: u32, message: impl Into<String>) -> Self {
        Error::Encoding {
            field,
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }

    /// Build a [`Error::Field`] for the given field index.
    pub fn field(field: u32, message: impl Into<String>) -> Self {
        Error::Field {
            field,
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }

    /// Build a [`Error::Pds`] for the given container field index.
    pub fn pds(field: u32, message: impl Into<String>) -> Self {
        Error::Pds {
            field,
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }

    /// Build a [`Error::Bitmap`].
    pub fn bitmap(message: impl Into<String>) -> Self {
        Error::Bitmap {
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }

    /// Build a [`Error::Block`].
    pub fn block(message: impl Into<String>) -> Self {
        Error::Block {
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }

    /// Build a [`Error::Truncated`].
    pub fn truncated(message: impl Into<String>) -> Self {
        Error::Truncated {
            message: message.into(),
            backtrace: Backtrace::new(),
        }
    }
}
