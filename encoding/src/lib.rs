#![deny(trivial_casts, trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! Character-encoding, field, bitmap and PDS sub-field codecs for ISO 8583
//! messages: C1 through C4 of the `cardutil` toolkit.
//!
//! - [`text`] — C1, translation between a wire character encoding
//!   (`cp500`, `cp037`, `latin-1`) and canonical text.
//! - [`field`] — C2, single-field encode/decode given a
//!   [`FieldDescriptor`](cardutil_core::field::FieldDescriptor).
//! - [`bitmap`] — C3, primary/secondary bitmap encode/decode.
//! - [`pds`] — C4, Private Data Subfield sub-TLV encode/decode.
//!
//! This crate has no notion of an entire message or file; that is
//! [`cardutil-parser`](https://docs.rs/cardutil-parser) and
//! [`cardutil-ipm`](https://docs.rs/cardutil-ipm) respectively.

pub mod bitmap;
mod ebcdic;
pub mod field;
pub mod pds;
pub mod text;

pub use text::TextEncoding;
