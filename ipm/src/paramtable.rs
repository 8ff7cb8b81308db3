//! C9: positional fixed-column extraction from IPM parameter records.
//!
//! An IPM parameter file is an IPM file whose records carry a single
//! text payload (on the wire, field 48 of an MTI 1644 record, by
//! convention). Each record's payload is interpreted as a row under a
//! declared column layout (half-open character ranges), filtered to the
//! rows whose own `table_id` column matches the caller's selection.

use chrono::format::{parse, Parsed, StrftimeItems};
use chrono::NaiveDate;

use cardutil_core::config::ParamColumnKind;
use cardutil_core::{Error, ParamTableLayout, Record, Result, Value};

/// Field index of the MCI IPM parameter record's sole text payload, by
/// convention field 48 of an MTI 1644 record.
pub const PARAM_FIELD: u32 = 48;

/// Extracts rows matching a given `table_id` from parameter records, per
/// a declared column layout.
#[derive(Debug, Clone, Copy)]
pub struct ParamTableExtractor<'a> {
    layout: &'a ParamTableLayout,
}

impl<'a> ParamTableExtractor<'a> {
    /// Build an extractor over the given column layout.
    pub fn new(layout: &'a ParamTableLayout) -> Self {
        ParamTableExtractor { layout }
    }

    /// Interpret `payload` (a parameter record's field-48 text) as one
    /// row and, if its `table_id_column` matches `table_id`, return a
    /// flat record keyed by column name. Returns `None` for a non-
    /// matching row.
    pub fn extract(&self, payload: &str, table_id_column: &str, table_id: &str) -> Result<Option<Record>> {
        let chars: Vec<char> = payload.chars().collect();

        let id_column = self.layout.column(table_id_column).ok_or_else(|| {
            Error::config(format!("parameter table layout has no {table_id_column:?} column"))
        })?;
        if slice(&chars, id_column.start, id_column.end).trim() != table_id {
            return Ok(None);
        }

        let mut record = Record::new();
        for column in &self.layout.columns {
            let raw = slice(&chars, column.start, column.end);
            let value = match &column.kind {
                ParamColumnKind::Text => raw,
                ParamColumnKind::Datetime { pattern, century_pivot } => {
                    parse_pivoted_date(&raw, pattern, *century_pivot, &column.name)?
                }
            };
            record.set(column.name.clone(), Value::Text(value));
        }
        Ok(Some(record))
    }
}

fn slice(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect()
}

/// Parse a `YYMMDD`-style date under an explicit century pivot: years
/// below `century_pivot` are `20xx`, otherwise `19xx`. `chrono`'s own
/// `%y` resolution uses a fixed pivot, so the two-digit year is pulled
/// out of `chrono::format::Parsed` and resolved by hand rather than
/// trusting `NaiveDate::parse_from_str` end-to-end.
fn parse_pivoted_date(raw: &str, pattern: &str, century_pivot: u32, column: &str) -> Result<String> {
    let mut parsed = Parsed::new();
    parse(&mut parsed, raw, StrftimeItems::new(pattern))
        .map_err(|e| Error::config(format!("column {column}: {raw:?} does not match {pattern:?}: {e}")))?;

    let year_mod_100 = parsed
        .year_mod_100
        .ok_or_else(|| Error::config(format!("column {column}: pattern {pattern:?} has no %y component")))?
        as u32;
    let month = parsed
        .month
        .ok_or_else(|| Error::config(format!("column {column}: pattern {pattern:?} has no month component")))?;
    let day = parsed
        .day
        .ok_or_else(|| Error::config(format!("column {column}: pattern {pattern:?} has no day component")))?;

    let year = if year_mod_100 < century_pivot { 2000 + year_mod_100 } else { 1900 + year_mod_100 };
    let date = NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| Error::config(format!("column {column}: {raw:?} is not a valid calendar date")))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardutil_core::config::{ParamColumn, ParamColumnKind};

    fn layout() -> ParamTableLayout {
        ParamTableLayout {
            columns: vec![
                ParamColumn { name: "table_id".into(), start: 0, end: 2, kind: ParamColumnKind::Text },
                ParamColumn {
                    name: "effective_date".into(),
                    start: 2,
                    end: 8,
                    kind: ParamColumnKind::Datetime { pattern: "%y%m%d".into(), century_pivot: 70 },
                },
                ParamColumn { name: "currency".into(), start: 8, end: 11, kind: ParamColumnKind::Text },
            ],
        }
    }

    #[test]
    fn matches_table_id_and_parses_date() {
        let layout = layout();
        let extractor = ParamTableExtractor::new(&layout);
        let row = extractor.extract("01250314AUD", "table_id", "01").unwrap().unwrap();
        assert_eq!(row.get("effective_date").unwrap().as_text(), Some("2025-03-14"));
        assert_eq!(row.get("currency").unwrap().as_text(), Some("AUD"));
    }

    #[test]
    fn non_matching_table_id_returns_none() {
        let layout = layout();
        let extractor = ParamTableExtractor::new(&layout);
        assert!(extractor.extract("02250314AUD", "table_id", "01").unwrap().is_none());
    }

    #[test]
    fn century_pivot_resolves_pre_and_post_2000() {
        let layout = layout();
        let extractor = ParamTableExtractor::new(&layout);
        let old = extractor.extract("01990101AUD", "table_id", "01").unwrap().unwrap();
        assert_eq!(old.get("effective_date").unwrap().as_text(), Some("1999-01-01"));
        let new = extractor.extract("01050101AUD", "table_id", "01").unwrap().unwrap();
        assert_eq!(new.get("effective_date").unwrap().as_text(), Some("2005-01-01"));
    }
}
