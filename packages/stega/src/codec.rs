//! Marker encoding, detection and splitting.

use crate::error::{StegaError, StegaResult};
use serde::Serialize;
use serde_json::Value;
use std::ops::Range;

/// Digit alphabet, indexed by digit value.
pub const ZERO_WIDTHS: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Every marker starts with four zero digits (a NUL byte, which JSON never contains).
pub const MARKER_PREFIX: &str = "\u{200B}\u{200B}\u{200B}\u{200B}";

const DIGITS_PER_BYTE: usize = 4;

fn digit_of(c: char) -> Option<u8> {
    match c {
        '\u{200B}' => Some(0),
        '\u{200C}' => Some(1),
        '\u{200D}' => Some(2),
        '\u{FEFF}' => Some(3),
        _ => None,
    }
}

/// Visible text and the first marker run found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StegaSplit {
    /// Input with every well-formed marker removed
    pub cleaned: String,

    /// The first marker run, verbatim
    pub encoded: Option<String>,
}

/// Byte ranges of every well-formed marker in `text`.
///
/// A marker starts at a prefix inside a zero-width run and covers a whole
/// number of encoded bytes. Digits before it (a ZWJ from an emoji sequence,
/// say) or left over after its last byte belong to the visible text.
fn marker_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut run: Vec<(usize, char)> = Vec::new();

    for (idx, ch) in text.char_indices() {
        if digit_of(ch).is_some() {
            run.push((idx, ch));
            continue;
        }
        if let Some(span) = marker_in_run(&run) {
            spans.push(span);
        }
        run.clear();
    }
    if let Some(span) = marker_in_run(&run) {
        spans.push(span);
    }

    spans
}

fn marker_in_run(run: &[(usize, char)]) -> Option<Range<usize>> {
    let len = run.len();
    let starts: Vec<usize> = (0..len)
        .filter(|&p| {
            len - p >= DIGITS_PER_BYTE * 2
                && run[p..p + DIGITS_PER_BYTE]
                    .iter()
                    .all(|(_, c)| *c == ZERO_WIDTHS[0])
        })
        .collect();

    // Runs that end on a byte boundary first, then runs with up to three
    // stray digits after the marker. Either way the payload must decode.
    let flush = starts
        .iter()
        .copied()
        .filter(|p| (len - p) % DIGITS_PER_BYTE == 0)
        .map(|p| (p, len));
    let trimmed = starts
        .iter()
        .copied()
        .filter(|p| (len - p) % DIGITS_PER_BYTE != 0)
        .map(|p| (p, len - (len - p) % DIGITS_PER_BYTE));
    let (start, end) = flush
        .clone()
        .chain(trimmed)
        .find(|&(start, end)| decode_digits(&run_digits(&run[start..end])).is_ok())
        .or_else(|| flush.clone().next())?;

    let (begin, _) = run[start];
    let (last_idx, last_char) = run[end - 1];
    Some(begin..last_idx + last_char.len_utf8())
}

fn run_digits(run: &[(usize, char)]) -> Vec<u8> {
    run.iter().filter_map(|(_, c)| digit_of(*c)).collect()
}

fn has_zero_width(text: &str) -> bool {
    text.chars().any(|c| digit_of(c).is_some())
}

/// Split `text` into its visible part and its first marker.
pub fn split(text: &str) -> StegaSplit {
    if !has_zero_width(text) {
        return StegaSplit {
            cleaned: text.to_string(),
            encoded: None,
        };
    }

    let spans = marker_spans(text);
    let Some(first) = spans.first() else {
        return StegaSplit {
            cleaned: text.to_string(),
            encoded: None,
        };
    };
    let encoded = text[first.clone()].to_string();

    let mut cleaned = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in &spans {
        cleaned.push_str(&text[cursor..span.start]);
        cursor = span.end;
    }
    cleaned.push_str(&text[cursor..]);

    StegaSplit {
        cleaned,
        encoded: Some(encoded),
    }
}

/// Visible text with every marker removed. Idempotent.
pub fn strip(text: &str) -> String {
    split(text).cleaned
}

pub fn contains_marker(text: &str) -> bool {
    has_zero_width(text) && !marker_spans(text).is_empty()
}

/// Decode a marker run previously extracted by [`split`].
///
/// Back-to-back markers share one run; the first non-empty payload wins.
pub fn decode_encoded(encoded: &str) -> StegaResult<Value> {
    let digits: Vec<u8> = encoded.chars().filter_map(digit_of).collect();
    decode_digits(&digits)
}

fn decode_digits(digits: &[u8]) -> StegaResult<Value> {
    if digits.is_empty() {
        return Err(StegaError::NoMarker);
    }
    if digits.len() % DIGITS_PER_BYTE != 0 {
        return Err(StegaError::Misaligned { len: digits.len() });
    }

    let bytes: Vec<u8> = digits
        .chunks(DIGITS_PER_BYTE)
        .map(|chunk| chunk.iter().fold(0u8, |acc, d| (acc << 2) | d))
        .collect();

    let payload = bytes
        .split(|b| *b == 0)
        .find(|segment| !segment.is_empty())
        .ok_or(StegaError::NoMarker)?;

    let json = String::from_utf8(payload.to_vec())?;
    Ok(serde_json::from_str(&json)?)
}

/// Decode the first marker found in `text`.
pub fn decode_raw(text: &str) -> StegaResult<Value> {
    let encoded = split(text).encoded.ok_or(StegaError::NoMarker)?;
    decode_encoded(&encoded)
}

/// Encode a payload as a marker run.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> StegaResult<String> {
    let json = serde_json::to_string(payload)?;

    let mut out = String::with_capacity(MARKER_PREFIX.len() + json.len() * DIGITS_PER_BYTE * 3);
    out.push_str(MARKER_PREFIX);
    for byte in json.bytes() {
        for shift in [6u8, 4, 2, 0] {
            out.push(ZERO_WIDTHS[((byte >> shift) & 0b11) as usize]);
        }
    }

    Ok(out)
}

/// Append an encoded payload to visible text.
pub fn combine<T: Serialize + ?Sized>(visible: &str, payload: &T) -> StegaResult<String> {
    Ok(format!("{}{}", visible, encode(payload)?))
}
