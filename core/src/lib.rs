#![deny(trivial_casts, trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! Core data model for `cardutil`: the field descriptor table, the flat
//! `Record`/`Value` types that every codec reads and writes, and the
//! configuration document (`bit_config`, `output_data_elements`,
//! `mci_parameter_tables`) that drives them.
//!
//! This crate has no I/O of its own. Framing and character-encoding
//! concerns live in [`cardutil-encoding`](https://docs.rs/cardutil-encoding)
//! and [`cardutil-ipm`](https://docs.rs/cardutil-ipm).

pub mod config;
pub mod error;
pub mod field;
pub mod record;
pub mod value;

pub use config::{CardutilConfig, ParamTableLayout};
pub use error::{Error, Result};
pub use field::{DataType, FieldDescriptor, FieldTable, FieldType};
pub use record::Record;
pub use value::Value;
