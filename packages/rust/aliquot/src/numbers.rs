//! Unpacking of number lists such as `4 and 6 through 10` or `3 - 9, 12`.
//!
//! Shared by the section matcher (multi-section lists) and the lot unpacker.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// A number or an elision connector (`through`, `thru`, `to`, `-`).
/// Every other separator (commas, `and`, `&`) is dropped during tokenizing.
static NUMBER_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<num>\d+)|(?P<range>\bthrough\b|\bthru\b|\bto\b|-|–)")
        .expect("number token regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Num(u16),
    Range,
}

/// Result of unpacking a number list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberList {
    /// Every number in declared order, elided ranges expanded inclusively.
    pub numbers: Vec<u16>,
    /// Ranges written high-to-low (`10 - 6`), as `(start, end)` in source order.
    /// They are still expanded, in ascending order.
    pub descending_ranges: Vec<(u16, u16)>,
    /// Numbers appearing more than once, each reported once, in first-repeat order.
    pub duplicates: Vec<u16>,
}

/// Unpack a number list, expanding elided ranges.
///
/// Scans right-to-left so that a connector always binds the two numbers
/// immediately around it: `1 - 3 - 5` reads as `1`, then `3..=5`.
pub fn unpack_numbers(text: &str) -> NumberList {
    let tokens: Vec<Token> = NUMBER_TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| {
            if let Some(num) = caps.name("num") {
                num.as_str().parse().ok().map(Token::Num)
            } else {
                Some(Token::Range)
            }
        })
        .collect();

    let mut groups_rev: Vec<Vec<u16>> = Vec::new();
    let mut descending_rev: Vec<(u16, u16)> = Vec::new();

    let mut i = tokens.len();
    while i > 0 {
        i -= 1;
        let Token::Num(end) = tokens[i] else {
            continue;
        };

        match (i >= 2).then(|| (tokens[i - 1], tokens[i - 2])) {
            Some((Token::Range, Token::Num(start))) => {
                if start > end {
                    descending_rev.push((start, end));
                }
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                groups_rev.push((lo..=hi).collect());
                i -= 2;
            }
            _ => groups_rev.push(vec![end]),
        }
    }

    let numbers: Vec<u16> = groups_rev.into_iter().rev().flatten().collect();
    descending_rev.reverse();

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for n in &numbers {
        if !seen.insert(*n) && !duplicates.contains(n) {
            duplicates.push(*n);
        }
    }

    NumberList {
        numbers,
        descending_ranges: descending_rev,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_list() {
        let list = unpack_numbers("1, 2 and 4");
        assert_eq!(list.numbers, [1, 2, 4]);
        assert!(list.descending_ranges.is_empty());
        assert!(list.duplicates.is_empty());
    }

    #[test]
    fn elided_ranges_expand_inclusively() {
        assert_eq!(unpack_numbers("4 and 6 through 10").numbers, [4, 6, 7, 8, 9, 10]);
        assert_eq!(unpack_numbers("24 - 27").numbers, [24, 25, 26, 27]);
        assert_eq!(unpack_numbers("3 thru 5, 9 to 10").numbers, [3, 4, 5, 9, 10]);
        assert_eq!(unpack_numbers("1–2").numbers, [1, 2]);
    }

    #[test]
    fn descending_range_is_flagged_and_corrected() {
        let list = unpack_numbers("10 - 6");
        assert_eq!(list.numbers, [6, 7, 8, 9, 10]);
        assert_eq!(list.descending_ranges, [(10, 6)]);
    }

    #[test]
    fn duplicates_are_reported_not_removed() {
        let list = unpack_numbers("1, 2, 2, 3 - 5, 4");
        assert_eq!(list.numbers, [1, 2, 2, 3, 4, 5, 4]);
        assert_eq!(list.duplicates, [2, 4]);
    }

    #[test]
    fn chained_connectors_bind_right_to_left() {
        assert_eq!(unpack_numbers("1 - 3 - 5").numbers, [1, 3, 4, 5]);
    }

    #[test]
    fn dangling_connector_is_ignored() {
        assert_eq!(unpack_numbers("- 7").numbers, [7]);
        assert!(unpack_numbers("").numbers.is_empty());
    }
}
