//! The flat record: the common in-memory shape produced by every decoder
//! and consumed by every encoder in the toolkit.
//!
//! Keys follow one of the forms described in the data model: `MTI`,
//! `DE<n>` (`n` in 2..128), `PDS<nnnn>` (4-digit zero-padded tag), or an
//! arbitrary projected key such as `DE43_NAME` or `ICC_DATA`. The map
//! itself does not enforce key shape; [`Record::validate`] checks
//! encodability against a [`FieldTable`](crate::field::FieldTable).

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::field::FieldTable;
use crate::value::Value;

/// A flat, ordered mapping from string keys to [`Value`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

/// The parsed shape of a flat-record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// The `MTI` key.
    Mti,
    /// A top-level data element, `DE<n>`.
    DataElement(u32),
    /// A PDS subfield, `PDS<nnnn>`.
    Pds(u32),
    /// Anything else: a caller-defined projection.
    Other,
}

/// Parse a flat-record key into its recognised shape.
pub fn classify_key(key: &str) -> KeyKind {
    if key == "MTI" {
        return KeyKind::Mti;
    }
    if let Some(rest) = key.strip_prefix("DE") {
        if let Some(digits) = rest.split('_').next() {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) && digits == rest {
                if let Ok(n) = digits.parse::<u32>() {
                    return KeyKind::DataElement(n);
                }
            }
        }
    }
    if let Some(digits) = key.strip_prefix("PDS") {
        if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = digits.parse::<u32>() {
                return KeyKind::Pds(n);
            }
        }
    }
    KeyKind::Other
}

/// Render a PDS tag as its 4-digit zero-padded key.
pub fn pds_key(tag: u32) -> String {
    format!("PDS{tag:04}")
}

/// Render a data element index as its `DE<n>` key.
pub fn de_key(index: u32) -> String {
    format!("DE{index}")
}

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Record::default()
    }

    /// Fetch the `MTI` value, if present.
    pub fn mti(&self) -> Option<&str> {
        self.fields.get("MTI").and_then(Value::as_text)
    }

    /// Set the `MTI` value.
    pub fn set_mti(&mut self, mti: impl Into<String>) {
        self.fields.insert("MTI".to_owned(), Value::Text(mti.into()));
    }

    /// Fetch a top-level data element by index.
    pub fn de(&self, index: u32) -> Option<&Value> {
        self.fields.get(&de_key(index))
    }

    /// Set a top-level data element by index.
    pub fn set_de(&mut self, index: u32, value: impl Into<Value>) {
        self.fields.insert(de_key(index), value.into());
    }

    /// Remove a top-level data element by index, returning its prior
    /// value if any.
    pub fn remove_de(&mut self, index: u32) -> Option<Value> {
        self.fields.remove(&de_key(index))
    }

    /// Fetch a PDS subfield by tag.
    pub fn pds(&self, tag: u32) -> Option<&Value> {
        self.fields.get(&pds_key(tag))
    }

    /// Set a PDS subfield by tag.
    pub fn set_pds(&mut self, tag: u32, value: impl Into<Value>) {
        self.fields.insert(pds_key(tag), value.into());
    }

    /// Generic getter for any key, including projected keys such as
    /// `DE43_NAME` or `ICC_DATA`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Generic setter for any key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// All keys and values, in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The present set of top-level data element indices, in ascending
    /// order. Field 1 (the secondary bitmap indicator) is never reported
    /// here: it is derived, not stored.
    pub fn present_data_elements(&self) -> Vec<u32> {
        self.fields
            .keys()
            .filter_map(|k| match classify_key(k) {
                KeyKind::DataElement(n) if n != 1 => Some(n),
                _ => None,
            })
            .collect()
    }

    /// All `PDS<nnnn>` entries, ordered ascending by numeric tag per the
    /// PDS ordering invariant.
    pub fn pds_entries(&self) -> Vec<(u32, &Value)> {
        let mut out: Vec<(u32, &Value)> = self
            .fields
            .iter()
            .filter_map(|(k, v)| match classify_key(k) {
                KeyKind::Pds(tag) => Some((tag, v)),
                _ => None,
            })
            .collect();
        out.sort_by_key(|(tag, _)| *tag);
        out
    }

    /// Whether the record is encodable: every key is either `MTI`, a
    /// `DE<n>` with `n` configured in `table`, or a `PDS<nnnn>` whose
    /// container is configured in `table`. Unrecognised projected keys
    /// are tolerated, per the encoder's "unknown keys are ignored" rule;
    /// this check instead guards against `DE<n>`/`PDS<nnnn>` keys that
    /// name a field the table does not know about at all.
    pub fn validate(&self, table: &FieldTable) -> Result<()> {
        for key in self.fields.keys() {
            match classify_key(key) {
                KeyKind::Mti => {}
                KeyKind::DataElement(n) => {
                    if !table.contains(n) {
                        return Err(Error::config(format!(
                            "record key {key} has no matching field descriptor"
                        )));
                    }
                }
                KeyKind::Pds(_) => {
                    if table.container_fields().next().is_none() {
                        return Err(Error::config(format!(
                            "record key {key} present but no PDS container field is configured"
                        )));
                    }
                }
                KeyKind::Other => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}
