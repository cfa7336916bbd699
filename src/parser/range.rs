use std::{fmt, str::FromStr};

use crate::error::ParseError;

/// Decoded `Content-Range: bytes <first>-<last>/<complete-length | *>` value.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentRange {
    /// Offset of the first byte in the range.
    pub first: u64,
    /// Offset of the last byte in the range, inclusive.
    pub last: u64,
    /// Length of the complete representation, `None` when sent as `*`.
    pub complete_length: Option<u64>,
}

impl ContentRange {
    /// Creates a validated byte range.
    pub fn new(first: u64, last: u64, complete_length: Option<u64>) -> Result<Self, ParseError> {
        if first > last {
            return Err(ParseError::new(
                "Content-Range first byte position exceeds last byte position",
            ));
        }

        if last == u64::MAX {
            return Err(ParseError::new("Content-Range last byte position is out of range"));
        }

        if complete_length.is_some_and(|length| last >= length) {
            return Err(ParseError::new(
                "Content-Range last byte position must be below the complete length",
            ));
        }

        Ok(Self {
            first,
            last,
            complete_length,
        })
    }

    /// Number of bytes covered by the range, never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.last - self.first + 1
    }
}

impl FromStr for ContentRange {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::new("invalid Content-Range header");

        let (unit, spec) = value.trim().split_once(' ').ok_or_else(invalid)?;
        if !unit.eq_ignore_ascii_case("bytes") {
            return Err(ParseError::new("Content-Range unit must be `bytes`"));
        }

        let (range, length) = spec.trim().split_once('/').ok_or_else(invalid)?;
        let (first, last) = range.split_once('-').ok_or_else(invalid)?;

        let first = parse_position(first).ok_or_else(invalid)?;
        let last = parse_position(last).ok_or_else(invalid)?;
        let complete_length = match length.trim() {
            "*" => None,
            other => Some(parse_position(other).ok_or_else(invalid)?),
        };

        Self::new(first, last, complete_length)
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.complete_length {
            Some(length) => write!(f, "bytes {}-{}/{}", self.first, self.last, length),
            None => write!(f, "bytes {}-{}/*", self.first, self.last),
        }
    }
}

fn parse_position(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
