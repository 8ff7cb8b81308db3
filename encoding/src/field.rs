//! C2: encode/decode a single ISO 8583 field given its declared layout.
//!
//! A decode call consumes some number of bytes starting at an offset in
//! the input buffer and returns the decoded [`Value`] alongside the new
//! offset; an encode call turns a [`Value`] back into the bytes that
//! belong on the wire for that field. Padding only ever applies to
//! `FIXED` fields whose value is shorter than the declared length:
//! numeric types (`N`, `NS`) are left-padded with `'0'`, alphanumeric
//! (`AN`) is right-padded with `' '`. Variable-length fields are never
//! padded — the length prefix carries the exact size.

use cardutil_core::field::{DataType, FieldDescriptor, FieldType};
use cardutil_core::{Error, Result, Value};

use crate::text::{from_text, to_text, TextEncoding};

/// Decode one field starting at `buf[pos..]`, returning the decoded value
/// and the offset immediately after it.
pub fn decode_field(
    buf: &[u8],
    pos: usize,
    field: u32,
    descriptor: &FieldDescriptor,
    encoding: TextEncoding,
    hex_bin: bool,
) -> Result<(Value, usize)> {
    let mut p = pos;
    let units = match descriptor.field_type {
        FieldType::Fixed => descriptor.length,
        FieldType::LlVar => read_length_prefix(buf, &mut p, 2, field, encoding)?,
        FieldType::LllVar => read_length_prefix(buf, &mut p, 3, field, encoding)?,
    };

    if descriptor.field_type != FieldType::Fixed && units > descriptor.length {
        return Err(Error::field(
            field,
            format!(
                "declared length {units} exceeds maximum {} for {}",
                descriptor.length, descriptor.field_type
            ),
        ));
    }

    let wire_len = wire_byte_len(descriptor.data_type, units);
    let end = p
        .checked_add(wire_len)
        .filter(|&e| e <= buf.len())
        .ok_or_else(|| Error::truncated(format!("field {field}: need {wire_len} bytes, buffer too short")))?;
    let raw = &buf[p..end];
    p = end;

    let value = match descriptor.data_type {
        DataType::Alphanumeric | DataType::Numeric => Value::Text(to_text(raw, encoding, field)?),
        DataType::Binary => {
            if hex_bin {
                Value::Text(bytes_to_hex(raw))
            } else {
                Value::Bytes(raw.to_vec())
            }
        }
        DataType::Bcd => Value::Text(bcd_to_digits(raw, units, field)?),
    };

    Ok((value, p))
}

/// Encode one field's value into its on-wire bytes, including the length
/// prefix for `LLVAR`/`LLLVAR`.
pub fn encode_field(
    value: &Value,
    field: u32,
    descriptor: &FieldDescriptor,
    encoding: TextEncoding,
) -> Result<Vec<u8>> {
    let payload = encode_payload(value, field, descriptor, encoding)?;
    let units = unit_count(value, descriptor.data_type, field)?;

    if descriptor.field_type != FieldType::Fixed && units > descriptor.length {
        return Err(Error::field(
            field,
            format!(
                "value of {units} units exceeds maximum {} for {}",
                descriptor.length, descriptor.field_type
            ),
        ));
    }
    if descriptor.field_type == FieldType::Fixed && units > descriptor.length {
        return Err(Error::field(
            field,
            format!("value of {units} units overflows declared width {}", descriptor.length),
        ));
    }

    let mut out = Vec::with_capacity(payload.len() + 3);
    match descriptor.field_type {
        FieldType::Fixed => {}
        FieldType::LlVar => out.extend(from_text(&format!("{units:02}"), encoding, field)?),
        FieldType::LllVar => out.extend(from_text(&format!("{units:03}"), encoding, field)?),
    }
    out.extend(payload);
    Ok(out)
}

/// The number of "units" (characters/bytes/displayed digits) a value
/// occupies, independent of any padding that `FIXED` encoding will add.
fn unit_count(value: &Value, data_type: DataType, field: u32) -> Result<usize> {
    match data_type {
        DataType::Alphanumeric | DataType::Numeric => Ok(value
            .as_text()
            .ok_or_else(|| Error::field(field, "expected a text value for a text-typed field"))?
            .chars()
            .count()),
        DataType::Binary => match value {
            Value::Bytes(b) => Ok(b.len()),
            Value::Text(hex) => Ok(hex_digit_pairs(hex, field)?.len()),
        },
        DataType::Bcd => Ok(value
            .as_text()
            .ok_or_else(|| Error::field(field, "expected a text value for a BCD field"))?
            .chars()
            .count()),
    }
}

fn encode_payload(
    value: &Value,
    field: u32,
    descriptor: &FieldDescriptor,
    encoding: TextEncoding,
) -> Result<Vec<u8>> {
    let fixed_width = (descriptor.field_type == FieldType::Fixed).then_some(descriptor.length);

    match descriptor.data_type {
        DataType::Alphanumeric => {
            let text = value
                .as_text()
                .ok_or_else(|| Error::field(field, "expected text for an AN field"))?;
            let padded = pad_text(text, fixed_width, ' ', Pad::Right, field)?;
            from_text(&padded, encoding, field)
        }
        DataType::Numeric => {
            let text = value
                .as_text()
                .ok_or_else(|| Error::field(field, "expected text for an N field"))?;
            if !text.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::field(field, format!("{text:?} is not a numeric value")));
            }
            let padded = pad_text(text, fixed_width, '0', Pad::Left, field)?;
            from_text(&padded, encoding, field)
        }
        DataType::Binary => match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(hex) => hex_digit_pairs(hex, field),
        },
        DataType::Bcd => {
            let text = value
                .as_text()
                .ok_or_else(|| Error::field(field, "expected text for a BCD field"))?;
            if !text.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::field(field, format!("{text:?} is not a decimal BCD value")));
            }
            let padded = pad_text(text, fixed_width, '0', Pad::Left, field)?;
            Ok(digits_to_bcd(&padded))
        }
    }
}

#[derive(Clone, Copy)]
enum Pad {
    Left,
    Right,
}

fn pad_text(text: &str, width: Option<usize>, filler: char, side: Pad, field: u32) -> Result<String> {
    let Some(width) = width else {
        return Ok(text.to_owned());
    };
    let len = text.chars().count();
    if len > width {
        return Err(Error::field(
            field,
            format!("value {text:?} of length {len} overflows declared width {width}"),
        ));
    }
    if len == width {
        return Ok(text.to_owned());
    }
    let fill: String = std::iter::repeat(filler).take(width - len).collect();
    Ok(match side {
        Pad::Left => fill + text,
        Pad::Right => text.to_owned() + &fill,
    })
}

/// On-wire byte length for `units` displayed units of `data_type`: one
/// byte/char per unit, except BCD which packs two displayed digits per
/// byte (`ceil(units / 2)`).
fn wire_byte_len(data_type: DataType, units: usize) -> usize {
    match data_type {
        DataType::Bcd => (units + 1) / 2,
        _ => units,
    }
}

fn read_length_prefix(
    buf: &[u8],
    pos: &mut usize,
    digits: usize,
    field: u32,
    encoding: TextEncoding,
) -> Result<usize> {
    let end = pos
        .checked_add(digits)
        .filter(|&e| e <= buf.len())
        .ok_or_else(|| Error::truncated(format!("field {field}: truncated length prefix")))?;
    let text = to_text(&buf[*pos..end], encoding, field)?;
    *pos = end;
    if text.len() != digits || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::field(field, format!("length prefix {text:?} is not {digits} decimal digits")));
    }
    Ok(text.parse().expect("validated all-digit prefix"))
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn hex_digit_pairs(hex: &str, field: u32) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::field(field, format!("{hex:?} is not valid hex for a binary field")));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| Error::field(field, e.to_string())))
        .collect()
}

fn bcd_to_digits(raw: &[u8], units: usize, field: u32) -> Result<String> {
    let mut digits = String::with_capacity(raw.len() * 2);
    for &byte in raw {
        let hi = byte >> 4;
        let lo = byte & 0x0F;
        if hi > 9 || lo > 9 {
            return Err(Error::field(field, format!("byte {byte:#04x} is not packed BCD")));
        }
        digits.push((b'0' + hi) as char);
        digits.push((b'0' + lo) as char);
    }
    // An odd displayed length leaves one extra leading digit (required to
    // be zero by the left-zero-padding rule); drop it so the returned text
    // has exactly `units` characters.
    if digits.len() > units {
        digits.remove(0);
    }
    Ok(digits)
}

fn digits_to_bcd(digits: &str) -> Vec<u8> {
    let chars: Vec<u8> = digits.bytes().map(|b| b - b'0').collect();
    let padded_even = chars.len() % 2 != 0;
    let mut out = Vec::with_capacity((chars.len() + 1) / 2);
    let mut iter = chars.into_iter();
    if padded_even {
        let lo = iter.next().unwrap_or(0);
        out.push(lo);
    }
    while let (Some(hi), Some(lo)) = (iter.next(), iter.next()) {
        out.push(hi << 4 | lo);
    }
    out
}
