//! Field descriptors: the configuration-driven layout of a single ISO 8583
//! data element.
//!
//! Mirrors the "configuration-driven variant dispatch" design note: a sum
//! type for the length discipline (`FieldType`) crossed with a sum type for
//! the on-wire representation (`DataType`), plus a couple of independent
//! decorators (`subfields`, `date_format`) rather than extra variants.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// How a field's length is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// A fixed number of units, declared by [`FieldDescriptor::length`].
    Fixed,
    /// A 2-digit decimal length prefix followed by that many units.
    #[serde(rename = "LLVAR")]
    LlVar,
    /// A 3-digit decimal length prefix followed by that many units.
    #[serde(rename = "LLLVAR")]
    LllVar,
}

/// The on-wire representation of a field's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// Alphanumeric text, one character per unit.
    #[serde(rename = "AN")]
    Alphanumeric,
    /// Numeric text, one character per unit.
    #[serde(rename = "N")]
    Numeric,
    /// Raw bytes, one byte per unit.
    #[serde(rename = "B")]
    Binary,
    /// Binary-coded decimal: one displayed digit per unit, two units per
    /// wire byte, high nibble first, zero-padded on the left.
    #[serde(rename = "NS")]
    Bcd,
}

impl DataType {
    /// Whether values of this type are textual (as opposed to raw bytes)
    /// in their canonical decoded form.
    pub fn is_text(self) -> bool {
        !matches!(self, DataType::Binary)
    }
}

/// A parsed `date_format` decorator: an ISO 8601-style projection applied
/// on top of a text field's decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    /// The `chrono`-compatible strftime pattern the wire value is in.
    pub pattern: String,
}

/// One fixed-width slice of a `positional_subfields` decorator, e.g. the
/// `NAME` slice of field 43's card acceptor name/location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalSubfield {
    /// The projected key's suffix, e.g. `"NAME"` for `DE43_NAME`.
    pub name: String,
    /// Start offset, inclusive, in characters.
    pub start: usize,
    /// End offset, exclusive, in characters.
    pub end: usize,
}

/// The full declaration of one data element, as carried by the
/// `bit_config` configuration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Human label; not part of the wire format or of the flat record
    /// keying.
    pub name: String,
    /// Length discipline.
    pub field_type: FieldType,
    /// Exact length for `Fixed`; declared maximum for `LlVar`/`LllVar`.
    pub length: usize,
    /// On-wire representation.
    pub data_type: DataType,
    /// Marks this field as a PDS container: its decoded value is also fed
    /// through the PDS sub-codec.
    pub subfields: bool,
    /// Optional date/time decorator.
    pub date_format: Option<DateFormat>,
    /// Fixed-width slices projected into their own `DE<n>_<NAME>` keys on
    /// decode (e.g. `DE43_NAME`); empty for fields with no such decorator.
    pub positional_subfields: Vec<PositionalSubfield>,
}

impl FieldDescriptor {
    /// A plain fixed alphanumeric field, for tests and defaults.
    pub fn fixed_an(name: impl Into<String>, length: usize) -> Self {
        FieldDescriptor {
            name: name.into(),
            field_type: FieldType::Fixed,
            length,
            data_type: DataType::Alphanumeric,
            subfields: false,
            date_format: None,
            positional_subfields: Vec::new(),
        }
    }
}

/// On-disk shape of a single `bit_config` entry, as it appears in the JSON
/// configuration document. Kept separate from [`FieldDescriptor`] because
/// the wire vocabulary (`"LLVAR"`, `"NS"`, a `date_format` string) needs a
/// validating conversion step rather than a direct derive.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFieldDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "field_type")]
    pub field_type: FieldType,
    pub length: usize,
    pub data_type: DataType,
    #[serde(default)]
    pub subfields: bool,
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub positional_subfields: Vec<RawPositionalSubfield>,
}

/// On-disk shape of one `positional_subfields` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPositionalSubfield {
    /// Projected key suffix, e.g. `"NAME"`.
    pub name: String,
    /// Start offset, inclusive, in characters.
    pub start: usize,
    /// End offset, exclusive, in characters.
    pub end: usize,
}

impl RawFieldDescriptor {
    /// Validate and convert into a [`FieldDescriptor`].
    pub fn into_descriptor(self, field_index: u32) -> crate::error::Result<FieldDescriptor> {
        if self.length == 0 && self.field_type == FieldType::Fixed {
            return Err(crate::error::Error::config(format!(
                "field {field_index}: FIXED fields must declare a non-zero length"
            )));
        }
        for s in &self.positional_subfields {
            if s.start >= s.end {
                return Err(crate::error::Error::config(format!(
                    "field {field_index}: positional subfield {:?} has an empty or reversed range",
                    s.name
                )));
            }
        }
        Ok(FieldDescriptor {
            name: self.name.unwrap_or_else(|| format!("DE{field_index}")),
            field_type: self.field_type,
            length: self.length,
            data_type: self.data_type,
            subfields: self.subfields,
            date_format: self.date_format.map(|pattern| DateFormat { pattern }),
            positional_subfields: self
                .positional_subfields
                .into_iter()
                .map(|s| PositionalSubfield { name: s.name, start: s.start, end: s.end })
                .collect(),
        })
    }
}

/// A read-only, immutable-after-load table mapping field index (1..128)
/// to its descriptor. Safe to share across codec instances: it is built
/// once from configuration and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    fields: BTreeMap<u32, FieldDescriptor>,
}

impl FieldTable {
    /// Build a field table from already-validated descriptors.
    pub fn new(fields: BTreeMap<u32, FieldDescriptor>) -> Self {
        FieldTable { fields }
    }

    /// Look up the descriptor for a field index.
    pub fn get(&self, index: u32) -> Option<&FieldDescriptor> {
        self.fields.get(&index)
    }

    /// Whether the table has an entry for the given field index.
    pub fn contains(&self, index: u32) -> bool {
        self.fields.contains_key(&index)
    }

    /// Iterate over all declared fields in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldDescriptor)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// The set of field indices configured as PDS containers.
    pub fn container_fields(&self) -> impl Iterator<Item = u32> + '_ {
        self.fields
            .iter()
            .filter(|(_, d)| d.subfields)
            .map(|(k, _)| *k)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::Fixed => "FIXED",
            FieldType::LlVar => "LLVAR",
            FieldType::LllVar => "LLLVAR",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_descriptor_rejects_zero_length_fixed() {
        let raw = RawFieldDescriptor {
            name: None,
            field_type: FieldType::Fixed,
            length: 0,
            data_type: DataType::Alphanumeric,
            subfields: false,
            date_format: None,
            positional_subfields: Vec::new(),
        };
        assert!(raw.into_descriptor(3).is_err());
    }

    #[test]
    fn raw_descriptor_rejects_reversed_positional_subfield_range() {
        let raw = RawFieldDescriptor {
            name: None,
            field_type: FieldType::Fixed,
            length: 40,
            data_type: DataType::Alphanumeric,
            subfields: false,
            date_format: None,
            positional_subfields: vec![RawPositionalSubfield { name: "NAME".into(), start: 10, end: 5 }],
        };
        assert!(raw.into_descriptor(43).is_err());
    }

    #[test]
    fn field_table_lists_containers() {
        let mut fields = BTreeMap::new();
        fields.insert(48, {
            let mut d = FieldDescriptor::fixed_an("Additional data", 999);
            d.field_type = FieldType::LllVar;
            d.subfields = true;
            d
        });
        fields.insert(2, FieldDescriptor::fixed_an("PAN", 19));
        let table = FieldTable::new(fields);
        let containers: Vec<_> = table.container_fields().collect();
        assert_eq!(containers, vec![48]);
    }
}
