//! Township/Range matching over preprocessed text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use plss_shared::{Diagnostics, Layout, Trs};

/// How far back (in bytes) a continuation word may sit before a Twp/Rge.
const LOOKBACK: usize = 20;

/// The canonical form written by the preprocessor.
static TWPRGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bT(?P<tn>\d{1,3})(?P<td>[NS])-R(?P<rn>\d{1,3})(?P<rd>[EW])\b")
        .expect("valid regex")
});

/// One or more continuation words (`of`, `in said`, `within the`) ending the text.
static CONTINUATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:of|in|said|within)\b(?:\s+the\b)?[\s,;:.\-]*)+$")
        .expect("valid regex")
});

/// A section reference ending the text, e.g. `Sec 14 ` or `Sections 3 - 5, `.
static SECTION_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\bsec(?:tion)?s?\.?|§§?)\s*\d{1,2}(?:\s*(?:,|\band\b|&|\bthrough\b|\bthru\b|\bto\b|-|–)\s*\d{1,2})*\s*[,;:.]?\s*$",
    )
    .expect("valid regex")
});

/// An accepted Twp/Rge occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwpRgeMatch {
    /// Canonical short form, e.g. `154n97w`.
    pub value: String,
    pub start: usize,
    pub end: usize,
}

/// Every Twp/Rge in `text` consistent with `layout`.
///
/// For the section-first layouts a Twp/Rge introduced by a continuation word
/// (`lying within T154N-R97W`) belongs to a parenthetical, not to a new
/// tract, and is rejected as `twprge_ignored`. `Section 14 of T154N-R97W` is
/// kept: the continuation word there ties the Twp/Rge to its own section.
pub fn find_twprges(text: &str, layout: Layout, diag: &mut Diagnostics) -> Vec<TwpRgeMatch> {
    let section_first = !layout.twprge_first() && layout != Layout::CopyAll;

    let mut accepted = Vec::new();
    for found in all_twprges(text) {
        if section_first && is_continuation(&text[..found.start]) {
            diag.warn("twprge_ignored", found.value.clone());
            continue;
        }
        accepted.push(found);
    }

    debug!(%layout, count = accepted.len(), "matched Twp/Rge");
    accepted
}

/// The first Twp/Rge in `text`, with no rejection applied.
pub fn first_twprge(text: &str) -> Option<TwpRgeMatch> {
    all_twprges(text).next()
}

fn all_twprges(text: &str) -> impl Iterator<Item = TwpRgeMatch> + '_ {
    TWPRGE_RE.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let twp = format!("{}{}", &caps["tn"], &caps["td"]);
        let rge = format!("{}{}", &caps["rn"], &caps["rd"]);
        let trs = Trs::from_raw(
            Some(&twp),
            Some(&rge),
            None,
            Default::default(),
            Default::default(),
        );
        Some(TwpRgeMatch {
            value: trs.twprge(),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

/// Whether `before` ends with a continuation word that is not simply joining
/// a section reference to its Twp/Rge.
fn is_continuation(before: &str) -> bool {
    let Some(found) = CONTINUATION_RE.find(before) else {
        return false;
    };
    if before.len() - found.start() > LOOKBACK {
        return false;
    }
    !SECTION_TAIL_RE.is_match(&before[..found.start()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(text: &str, layout: Layout) -> (Vec<String>, Diagnostics) {
        let mut diag = Diagnostics::new();
        let found = find_twprges(text, layout, &mut diag);
        (found.into_iter().map(|m| m.value).collect(), diag)
    }

    #[test]
    fn canonical_tokens_become_short_values() {
        let (found, diag) = values("T154N-R97W Sec 1: ALL, T1S-R2E Sec 2: ALL", Layout::TrsDesc);
        assert_eq!(found, ["154n97w", "1s2e"]);
        assert!(diag.is_empty());
    }

    #[test]
    fn positions_cover_the_token() {
        let text = "NE/4 of Sec 14, T154N-R97W";
        let found = first_twprge(text).map(|m| (m.start, m.end));
        assert_eq!(found, Some((16, 26)));
        assert_eq!(&text[16..26], "T154N-R97W");
    }

    #[test]
    fn continuation_words_reject_in_section_first_layouts() {
        let text = "Sec 14: NE/4 lying within T155N-R97W, T154N-R97W";
        let (found, diag) = values(text, Layout::SDescTr);
        assert_eq!(found, ["154n97w"]);
        assert!(diag.warnings.iter().any(|f| f.to_string() == "twprge_ignored<155n97w>"));
    }

    #[test]
    fn section_followed_by_of_is_not_a_continuation() {
        let (found, diag) = values("NE/4 of Section 14 of T154N-R97W", Layout::DescStr);
        assert_eq!(found, ["154n97w"]);
        assert!(diag.is_empty());

        let (found, _) = values("S/2 of Sections 3 - 5, in said T154N-R97W", Layout::DescStr);
        assert_eq!(found, ["154n97w"]);
    }

    #[test]
    fn twprge_first_layouts_never_reject() {
        let (found, diag) = values("all of said T154N-R97W Sec 1: ALL", Layout::TrsDesc);
        assert_eq!(found, ["154n97w"]);
        assert!(diag.is_empty());
    }

    #[test]
    fn distant_continuation_word_is_ignored() {
        let text = "NE/4 of Sec 14 and more words in the road right of way, T154N-R97W";
        let (found, _) = values(text, Layout::DescStr);
        assert_eq!(found, ["154n97w"]);
    }
}
