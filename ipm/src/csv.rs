//! Flat-record ⇄ CSV row projection.
//!
//! `spec.md` treats the CSV formatter itself as an external collaborator,
//! but the projection contract it demands — an ordered column list,
//! unknown keys rendered as empty cells — is part of this crate's
//! surface, since both CLI tools need it on either side of the `csv`
//! crate's reader/writer.

use cardutil_core::{Record, Value};

/// Project a flat record into an ordered row of strings following
/// `columns`; a key absent from the record becomes an empty column.
/// Binary values render as uppercase hex, matching the `hex_bin` view
/// used everywhere else at the API surface.
pub fn record_to_row(record: &Record, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|key| record.get(key).map(Value::to_hex_text).unwrap_or_default())
        .collect()
}

/// Lift a CSV row back into a flat record keyed by `columns`. Empty
/// cells are omitted rather than stored as empty-string values, so that
/// a round trip through [`record_to_row`] does not introduce spurious
/// keys that were never present in the original record.
pub fn row_to_record(row: &[String], columns: &[String]) -> Record {
    let mut record = Record::new();
    for (key, value) in columns.iter().zip(row) {
        if !value.is_empty() {
            record.set(key.clone(), Value::Text(value.clone()));
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_column_becomes_empty_cell() {
        let mut record = Record::new();
        record.set_mti("1144");
        let columns = vec!["MTI".to_owned(), "DE2".to_owned()];
        assert_eq!(record_to_row(&record, &columns), vec!["1144".to_owned(), String::new()]);
    }

    #[test]
    fn empty_cells_do_not_round_trip_into_spurious_keys() {
        let columns = vec!["MTI".to_owned(), "DE2".to_owned()];
        let row = vec!["1144".to_owned(), String::new()];
        let record = row_to_record(&row, &columns);
        assert_eq!(record.mti(), Some("1144"));
        assert!(record.de(2).is_none());
    }
}
