//! Bounded display view over the latest batch.
//!
//! The view is derived, never stored on its own: take the trailing
//! [`WINDOW_LEN`] records of the batch, then positionally replace ids with
//! user-supplied override tokens that look numeric.

use crate::Record;

/// Maximum number of records in a display view.
pub const WINDOW_LEN: usize = 10;

/// Returns the last `min(WINDOW_LEN, records.len())` records, in order.
pub fn trailing_window(records: &[Record]) -> &[Record] {
    &records[records.len().saturating_sub(WINDOW_LEN)..]
}

/// Splits a raw override string into trimmed, non-empty tokens.
///
/// `"1, ,2,"` yields `["1", "2"]`; an empty string yields nothing.
pub fn parse_override_ids(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Whether `token` reads as a number.
///
/// Accepted forms:
/// - decimal with optional sign, fraction and exponent (`-1`, `.5`, `2.`,
///   `1e3`)
/// - `Infinity` with optional sign
/// - unsigned `0x`, `0o` and `0b` integer literals
///
/// Everything else, including `NaN`, `inf` and the empty string, is
/// rejected.
pub fn looks_numeric(token: &str) -> bool {
    let unsigned = token
        .strip_prefix('+')
        .or_else(|| token.strip_prefix('-'))
        .unwrap_or(token);
    if unsigned == "Infinity" {
        return true;
    }

    let radix = token.get(..2).and_then(|prefix| {
        match prefix.to_ascii_lowercase().as_str() {
            "0x" => Some(16),
            "0o" => Some(8),
            "0b" => Some(2),
            _ => None,
        }
    });
    if let Some(radix) = radix {
        let digits = &token[2..];
        return !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
    }

    is_decimal_literal(unsigned)
}

fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut pos = 0;

    let int_digits = count_digits(&bytes[pos..]);
    pos += int_digits;

    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        frac_digits = count_digits(&bytes[pos..]);
        pos += frac_digits;
    }
    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        let exp_digits = count_digits(&bytes[pos..]);
        if exp_digits == 0 {
            return false;
        }
        pos += exp_digits;
    }

    pos == bytes.len()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Maps `window` positionally onto `overrides`.
///
/// Position `j` takes `overrides[j]` as its id when that token exists and
/// [`looks_numeric`]; every other record is kept as is. Tokens beyond the
/// window are ignored.
pub fn apply_overrides(window: &[Record], overrides: &[&str]) -> Vec<Record> {
    window
        .iter()
        .enumerate()
        .map(|(j, record)| match overrides.get(j) {
            Some(token) if looks_numeric(token) => record.with_id(*token),
            _ => record.clone(),
        })
        .collect()
}

/// Computes the display view for `records` under the raw override string.
pub fn display_view(records: &[Record], additional_ids: &str) -> Vec<Record> {
    let trailing = trailing_window(records);
    let overrides = parse_override_ids(additional_ids);
    if overrides.is_empty() {
        trailing.to_vec()
    } else {
        apply_overrides(trailing, &overrides)
    }
}
