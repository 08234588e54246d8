//! Lot extraction: `Lots 3 - 9`, `Lot 1(40.5)`, `N2 of Lots 1, 2`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use plss_shared::Diagnostics;

use crate::numbers::unpack_numbers;

/// Compact aliquot prefix + `of (the)` + `Lot(s)` + number list with optional acreage.
/// Expects text already run through the aliquot normalizer.
static LOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        (?:\b(?P<prefix>(?:[NS][EW]|[NSEW]2)+)\s+of\s+(?:the\s+)?)?
        \b(?P<label>lots?)\.?\s*
        (?P<body>
            \d{1,3}(?:\s*\([^)]*\))?
            (?:
                \s*(?:,|\band\b|&|\bthrough\b|\bthru\b|\bto\b|-|–)\s*
                (?:and\s+)?(?:lots?\.?\s*)?
                \d{1,3}(?:\s*\([^)]*\))?
            )*
        )",
    )
    .expect("lot regex")
});

/// `3(40.25)`, `3 (39,98 ac.)`.
static LOT_ACRES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<num>\d{1,3})\s*\(\s*(?P<acres>\d+(?:[.,]\d+)?)\s*(?:ac(?:res?)?\.?)?\s*\)",
    )
    .expect("lot acreage regex")
});

static PARENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parens regex"));

static LOT_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blots?\.?").expect("lot word regex"));

/// Lots found in a description, plus the text left once they are removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LotsFound {
    /// Lot tokens in source order: `L1`, `N2 of L3`.
    pub lots: Vec<String>,
    /// Lot token (`L1`) to acreage as written, comma decimal normalized.
    pub acres: BTreeMap<String, String>,
    /// The input with every lot reference blanked out.
    pub remainder: String,
}

/// Extract lot references from normalized text.
///
/// Elided ranges expand inclusively; a descending range is flagged
/// `nonSequen_Lots` and still expanded in ascending order. Duplicate lots are
/// flagged `dup_lot` and kept. A leading aliquot prefix applies to every lot
/// when the label is plural (`Lots`), otherwise only to the first.
pub fn unpack_lots(text: &str, diag: &mut Diagnostics) -> LotsFound {
    let mut found = LotsFound::default();

    let remainder = LOT_RE.replace_all(text, |caps: &Captures| {
        let body = &caps["body"];
        let plural = caps["label"].to_ascii_lowercase().ends_with('s');
        let prefix = caps.name("prefix").map(|m| m.as_str().to_ascii_uppercase());

        for acres in LOT_ACRES_RE.captures_iter(body) {
            if let Ok(num) = acres["num"].parse::<u16>() {
                found
                    .acres
                    .insert(format!("L{num}"), acres["acres"].replace(',', "."));
            }
        }

        let numbers_text = PARENS_RE.replace_all(body, " ");
        let numbers_text = LOT_WORD_RE.replace_all(&numbers_text, " ");
        let list = unpack_numbers(&numbers_text);

        for (start, end) in &list.descending_ranges {
            diag.warn("nonSequen_Lots", format!("{start}-{end}"));
        }

        for (i, num) in list.numbers.iter().enumerate() {
            let lot = format!("L{num}");
            match &prefix {
                Some(p) if plural || i == 0 => {
                    let divided = format!("{p} of {lot}");
                    diag.warn_once("lot_with_aliquot", divided.clone());
                    found.lots.push(divided);
                }
                _ => found.lots.push(lot),
            }
        }

        " ".to_string()
    });
    found.remainder = remainder.into_owned();

    let mut seen = std::collections::HashSet::new();
    for lot in &found.lots {
        if !seen.insert(lot.as_str()) {
            diag.warn_once("dup_lot", lot.clone());
        }
    }

    found
}
