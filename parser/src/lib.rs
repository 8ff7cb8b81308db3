#![deny(trivial_casts, trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! The ISO 8583 message codec (C5): drives the field, bitmap and PDS
//! codecs from [`cardutil_encoding`] across a whole message, producing
//! and consuming the flat [`Record`](cardutil_core::Record) shared by
//! every codec in the toolkit.

pub mod date;
pub mod message;

pub use message::Iso8583Codec;
