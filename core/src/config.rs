//! Configuration loading.
//!
//! A single JSON document drives every codec: `bit_config` supplies the
//! [`FieldTable`], `output_data_elements` is consumed by the CSV
//! projection tools, and `mci_parameter_tables` supplies the column
//! layouts used by the parameter-table extractor (C9).
//!
//! The document is located either by an explicit path (the CLI's
//! `--config-file` flag) or by the `CARDUTIL_CONFIG` environment variable,
//! which names a directory containing `cardutil.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::field::{FieldTable, RawFieldDescriptor};

/// The environment variable naming the directory that holds
/// `cardutil.json`.
pub const CONFIG_ENV_VAR: &str = "CARDUTIL_CONFIG";

/// A single column of a parameter-table layout: a half-open character
/// range plus how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamColumn {
    /// The column name, used as the flat-record key for matched rows.
    pub name: String,
    /// Start offset, inclusive, in characters.
    pub start: usize,
    /// End offset, exclusive, in characters.
    pub end: usize,
    /// Parsed as a date/time using `datetime_format`/`century_pivot` when
    /// set to [`ParamColumnKind::Datetime`].
    pub kind: ParamColumnKind,
}

/// The interpretation applied to a parameter-table column's raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamColumnKind {
    /// Plain text, passed through unchanged.
    Text,
    /// A `YYMMDD`-style date, parsed with the given pattern and century
    /// pivot (years `< pivot` are 20xx, otherwise 19xx).
    Datetime { pattern: String, century_pivot: u32 },
}

/// The column layout for one `mci_parameter_tables` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamTableLayout {
    /// Declared columns, in configuration order (not necessarily sorted
    /// by `start`).
    pub columns: Vec<ParamColumn>,
}

impl ParamTableLayout {
    /// Find the column declared with the given name.
    pub fn column(&self, name: &str) -> Option<&ParamColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The fully loaded and validated cardutil configuration.
#[derive(Debug, Clone, Default)]
pub struct CardutilConfig {
    /// The ISO 8583 field table (C2/C5 layout).
    pub bit_config: FieldTable,
    /// Ordered flat-record keys that the CSV projector emits as columns.
    pub output_data_elements: Vec<String>,
    /// Column layouts for IPM parameter tables, keyed by `table_id`.
    pub mci_parameter_tables: BTreeMap<String, ParamTableLayout>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    bit_config: BTreeMap<String, RawFieldDescriptor>,
    #[serde(default)]
    output_data_elements: Vec<String>,
    #[serde(default)]
    mci_parameter_tables: BTreeMap<String, Vec<RawParamColumn>>,
}

#[derive(Debug, Deserialize)]
struct RawParamColumn {
    name: String,
    start: usize,
    end: usize,
    #[serde(default)]
    field_type: Option<String>,
    #[serde(default)]
    datetime_format: Option<String>,
    #[serde(default)]
    century_pivot: Option<u32>,
}

impl CardutilConfig {
    /// Parse a configuration document from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("invalid configuration JSON: {e}")))?;

        let mut bit_config = BTreeMap::new();
        for (key, raw_field) in raw.bit_config {
            let index: u32 = key
                .parse()
                .map_err(|_| Error::config(format!("bit_config key {key:?} is not a field index")))?;
            bit_config.insert(index, raw_field.into_descriptor(index)?);
        }

        let mut mci_parameter_tables = BTreeMap::new();
        for (table_id, raw_columns) in raw.mci_parameter_tables {
            let mut columns = Vec::with_capacity(raw_columns.len());
            for c in raw_columns {
                let kind = match c.field_type.as_deref() {
                    Some("datetime") => ParamColumnKind::Datetime {
                        pattern: c.datetime_format.ok_or_else(|| {
                            Error::config(format!(
                                "column {} in table {table_id} is datetime but has no datetime_format",
                                c.name
                            ))
                        })?,
                        century_pivot: c.century_pivot.unwrap_or(70),
                    },
                    _ => ParamColumnKind::Text,
                };
                columns.push(ParamColumn {
                    name: c.name,
                    start: c.start,
                    end: c.end,
                    kind,
                });
            }
            mci_parameter_tables.insert(table_id, ParamTableLayout { columns });
        }

        Ok(CardutilConfig {
            bit_config: FieldTable::new(bit_config),
            output_data_elements: raw.output_data_elements,
            mci_parameter_tables,
        })
    }

    /// Load configuration from an explicit file path.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading cardutil configuration");
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Resolve the configuration file path the way the CLI tools do: an
    /// explicit `--config-file` override if given, otherwise
    /// `$CARDUTIL_CONFIG/cardutil.json`.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(p) = explicit {
            return Ok(p.to_path_buf());
        }
        let dir = std::env::var_os(CONFIG_ENV_VAR).ok_or_else(|| {
            Error::config(format!(
                "no --config-file given and {CONFIG_ENV_VAR} is not set"
            ))
        })?;
        Ok(PathBuf::from(dir).join("cardutil.json"))
    }

    /// Load configuration using the CLI resolution order (see
    /// [`Self::resolve_path`]).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;
        Self::load_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "bit_config": {
            "2": {"name": "PAN", "field_type": "LLVAR", "length": 19, "data_type": "N"},
            "48": {"name": "Additional data", "field_type": "LLLVAR", "length": 999, "data_type": "AN", "subfields": true}
        },
        "output_data_elements": ["MTI", "DE2", "PDS0023"],
        "mci_parameter_tables": {
            "1": [
                {"name": "table_id", "start": 0, "end": 2},
                {"name": "effective_date", "start": 2, "end": 8, "field_type": "datetime", "datetime_format": "%y%m%d"}
            ]
        }
    }
    "#;

    #[test]
    fn parses_bit_config_and_tables() {
        let cfg = CardutilConfig::from_json(SAMPLE).expect("valid config");
        let pan = cfg.bit_config.get(2).expect("field 2 present");
        assert_eq!(pan.name, "PAN");
        assert!(cfg.bit_config.get(48).unwrap().subfields);
        assert_eq!(cfg.output_data_elements, vec!["MTI", "DE2", "PDS0023"]);
        let layout = cfg.mci_parameter_tables.get("1").expect("table 1 present");
        let col = layout.column("effective_date").expect("column present");
        assert!(matches!(col.kind, ParamColumnKind::Datetime { .. }));
    }

    #[test]
    fn rejects_non_numeric_field_index() {
        let bad = r#"{"bit_config": {"x": {"field_type": "FIXED", "length": 4, "data_type": "AN"}}}"#;
        assert!(CardutilConfig::from_json(bad).is_err());
    }
}
