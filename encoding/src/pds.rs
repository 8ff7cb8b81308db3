//! C4: the Private Data Subfield (PDS) sub-TLV codec.
//!
//! A PDS container field's decoded text is a concatenation of
//! `tag(4 digits) + length(3 digits) + value(length chars)` sub-records.
//! This module operates purely on already-decoded text (the container
//! field's own data-type/encoding handling is C2's job); it has no
//! knowledge of the byte-level wire encoding.

use cardutil_core::{Error, Result};

const TAG_DIGITS: usize = 4;
const LEN_DIGITS: usize = 3;

/// Parse a container field's text payload into its `(tag, value)`
/// sub-records, in the order they appear on the wire.
pub fn decode(text: &str, field: u32) -> Result<Vec<(u32, String)>> {
    let chars: Vec<char> = text.chars().collect();
    let mut entries = Vec::new();
    let mut p = 0usize;
    while p < chars.len() {
        let tag = read_digits(&chars, &mut p, TAG_DIGITS, field, "tag")?;
        let len = read_digits(&chars, &mut p, LEN_DIGITS, field, "length")?;
        let len = len as usize;
        if p + len > chars.len() {
            return Err(Error::pds(field, format!("subfield {tag:04} declares length {len} past end of container")));
        }
        let value: String = chars[p..p + len].iter().collect();
        p += len;
        entries.push((tag, value));
    }
    Ok(entries)
}

/// Emit a container field's text payload from its sub-records. The caller
/// is responsible for ordering (ascending by tag, per the PDS ordering
/// invariant); this function concatenates in the order given.
pub fn encode(entries: &[(u32, &str)]) -> String {
    let mut out = String::new();
    for (tag, value) in entries {
        out.push_str(&format!("{tag:04}{:03}{value}", value.chars().count()));
    }
    out
}

fn read_digits(chars: &[char], p: &mut usize, count: usize, field: u32, what: &str) -> Result<u32> {
    if *p + count > chars.len() {
        return Err(Error::pds(field, format!("truncated {what} in PDS container")));
    }
    let slice = &chars[*p..*p + count];
    if !slice.iter().all(|c| c.is_ascii_digit()) {
        return Err(Error::pds(field, format!("non-numeric {what} {:?} in PDS container", slice.iter().collect::<String>())));
    }
    let text: String = slice.iter().collect();
    *p += count;
    Ok(text.parse().expect("validated all-digit field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_two_subfields_in_ascending_order() {
        let text = "0023003ABC0148003XYZ";
        let entries = decode(text, 48).unwrap();
        assert_eq!(entries, vec![(23, "ABC".to_owned()), (148, "XYZ".to_owned())]);
        let refs: Vec<(u32, &str)> = entries.iter().map(|(t, v)| (*t, v.as_str())).collect();
        assert_eq!(encode(&refs), text);
    }

    #[test]
    fn length_overrun_is_pds_error() {
        let text = "0023999AB";
        assert!(decode(text, 48).is_err());
    }

    #[test]
    fn truncated_tag_is_pds_error() {
        let text = "002";
        assert!(decode(text, 48).is_err());
    }

    #[test]
    fn empty_container_decodes_to_no_subfields() {
        assert_eq!(decode("", 48).unwrap(), Vec::new());
    }
}
