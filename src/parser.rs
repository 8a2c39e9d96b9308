//! Numeric parser

use crate::memory::Cell;

#[derive(PartialEq, Debug)]
pub enum IResult<'l, T> {
    Done(&'l [u8], T),
    Err,
}

/// Optional leading sign. Returns true for a minus.
pub fn sign(input: &[u8]) -> IResult<bool> {
    match input.first() {
        Some(b'+') => IResult::Done(&input[1..], false),
        Some(b'-') => IResult::Done(&input[1..], true),
        _ => IResult::Done(input, false),
    }
}

/// Value of digit `c` in radix 36, `None` if `c` is not alphanumeric.
fn digit(c: u8) -> Option<u32> {
    match c {
        b'0'..=b'9' => Some((c - b'0') as u32),
        b'a'..=b'z' => Some((c - b'a') as u32 + 10),
        b'A'..=b'Z' => Some((c - b'A') as u32 + 10),
        _ => None,
    }
}

/// Consume every byte of `input` as a digit in `base`.
///
/// Fails on an empty input, on any byte that is not a digit in `base`, or
/// when the magnitude no longer fits in a cell.
pub fn uint_in_base(input: &[u8], base: u32) -> IResult<u32> {
    if input.is_empty() {
        return IResult::Err;
    }
    let mut value = 0u32;
    for c in input {
        let d = match digit(*c) {
            Some(d) if d < base => d,
            _ => return IResult::Err,
        };
        value = value * base + d;
        if value > Cell::MAX as u32 {
            return IResult::Err;
        }
    }
    IResult::Done(&input[input.len()..], value)
}

/// Parse `token` as a number in `base`.
///
/// Positive numbers may use the full cell range, negative ones down to
/// `-32768`. No partial parse: anything else yields `None`.
pub fn parse_number(token: &[u8], base: Cell) -> Option<Cell> {
    if base < 2 || base > 36 {
        return None;
    }
    let (rest, negative) = match sign(token) {
        IResult::Done(rest, negative) => (rest, negative),
        IResult::Err => return None,
    };
    match uint_in_base(rest, base as u32) {
        IResult::Done(_, v) if !negative => Some(v as Cell),
        IResult::Done(_, v) if v <= 0x8000 => Some((v as Cell).wrapping_neg()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign() {
        assert_eq!(sign(b"-12"), IResult::Done(&b"12"[..], true));
        assert_eq!(sign(b"+12"), IResult::Done(&b"12"[..], false));
        assert_eq!(sign(b"12"), IResult::Done(&b"12"[..], false));
    }

    #[test]
    fn test_decimal() {
        assert_eq!(parse_number(b"0", 10), Some(0));
        assert_eq!(parse_number(b"123", 10), Some(123));
        assert_eq!(parse_number(b"-3", 10), Some(0xfffd));
        assert_eq!(parse_number(b"+7", 10), Some(7));
        assert_eq!(parse_number(b"65535", 10), Some(65535));
        assert_eq!(parse_number(b"-32768", 10), Some(0x8000));
    }

    #[test]
    fn test_other_bases() {
        assert_eq!(parse_number(b"ff", 16), Some(255));
        assert_eq!(parse_number(b"FF", 16), Some(255));
        assert_eq!(parse_number(b"101", 2), Some(5));
        assert_eq!(parse_number(b"z", 36), Some(35));
        assert_eq!(parse_number(b"ff", 10), None);
        assert_eq!(parse_number(b"2", 2), None);
    }

    #[test]
    fn test_rejects() {
        assert_eq!(parse_number(b"", 10), None);
        assert_eq!(parse_number(b"-", 10), None);
        assert_eq!(parse_number(b"--1", 10), None);
        assert_eq!(parse_number(b"12a", 10), None);
        assert_eq!(parse_number(b"FOO", 10), None);
        assert_eq!(parse_number(b"65536", 10), None);
        assert_eq!(parse_number(b"-32769", 10), None);
        assert_eq!(parse_number(b"1.5", 10), None);
        assert_eq!(parse_number(b"1", 1), None);
        assert_eq!(parse_number(b"1", 37), None);
    }
}
