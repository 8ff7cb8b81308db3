//! Date/time decorator layered on top of a text field's decoded value
//! when its descriptor names a `date_format`.
//!
//! Per the design note on configuration-driven variant dispatch, this is
//! a post-processing pass over the field codec's (C2) output, not an
//! additional field-type variant: the wire bytes are untouched, only the
//! flat-record projection gains an ISO 8601 calendar form under the same
//! key.

use cardutil_core::field::DateFormat;
use cardutil_core::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};

const ISO_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";
const ISO_DATE: &str = "%Y-%m-%d";

fn pattern_has_time(pattern: &str) -> bool {
    ["%H", "%M", "%S", "%T"].iter().any(|p| pattern.contains(p))
}

/// Project a raw wire-format date/time string into its ISO 8601 form.
pub fn to_iso8601(raw: &str, format: &DateFormat, field: u32) -> Result<String> {
    if pattern_has_time(&format.pattern) {
        let dt = NaiveDateTime::parse_from_str(raw, &format.pattern).map_err(|e| {
            Error::field(field, format!("date {raw:?} does not match {:?}: {e}", format.pattern))
        })?;
        Ok(dt.format(ISO_DATETIME).to_string())
    } else {
        let d = NaiveDate::parse_from_str(raw, &format.pattern).map_err(|e| {
            Error::field(field, format!("date {raw:?} does not match {:?}: {e}", format.pattern))
        })?;
        Ok(d.format(ISO_DATE).to_string())
    }
}

/// Invert [`to_iso8601`]: turn an ISO 8601 string back into the field's
/// declared wire pattern.
pub fn from_iso8601(iso: &str, format: &DateFormat, field: u32) -> Result<String> {
    if pattern_has_time(&format.pattern) {
        let dt = NaiveDateTime::parse_from_str(iso, ISO_DATETIME)
            .map_err(|e| Error::field(field, format!("{iso:?} is not an ISO 8601 datetime: {e}")))?;
        Ok(dt.format(&format.pattern).to_string())
    } else {
        let d = NaiveDate::parse_from_str(iso, ISO_DATE)
            .map_err(|e| Error::field(field, format!("{iso:?} is not an ISO 8601 date: {e}")))?;
        Ok(d.format(&format.pattern).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yymmdd_round_trip() {
        let fmt = DateFormat { pattern: "%y%m%d".to_owned() };
        let iso = to_iso8601("250314", &fmt, 12).unwrap();
        assert_eq!(iso, "2025-03-14");
        assert_eq!(from_iso8601(&iso, &fmt, 12).unwrap(), "250314");
    }

    #[test]
    fn hhmmss_round_trip() {
        let fmt = DateFormat { pattern: "%H%M%S".to_owned() };
        let iso = to_iso8601("235959", &fmt, 12).unwrap();
        assert_eq!(iso, "1970-01-01T23:59:59");
        assert_eq!(from_iso8601(&iso, &fmt, 12).unwrap(), "235959");
    }

    #[test]
    fn unparsable_date_is_field_error() {
        let fmt = DateFormat { pattern: "%y%m%d".to_owned() };
        assert!(to_iso8601("notadate", &fmt, 12).is_err());
    }
}
