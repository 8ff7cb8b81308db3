#![deny(trivial_casts, trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! The IPM clearing file codec: C6 through C9 of the `cardutil` toolkit,
//! layered on top of [`cardutil_parser`]'s ISO 8583 message codec.
//!
//! - [`vbs`] — C6, variable-block-sequential record framing.
//! - [`block1014`] — C7, the fixed 1014-byte physical block envelope.
//! - [`ipm`] — C8, `IpmReader`/`IpmWriter`.
//! - [`paramtable`] — C9, parameter-table extraction.
//! - [`csv`] — flat-record/CSV-row projection.
//! - [`convert`] — the encoding-conversion tool.

pub mod block1014;
pub mod convert;
pub mod csv;
pub mod ipm;
pub mod paramtable;
pub mod vbs;

pub use ipm::{IpmReader, IpmWriter};
pub use paramtable::ParamTableExtractor;
